#[cfg(feature = "sqlite")]
pub use sqlite;
