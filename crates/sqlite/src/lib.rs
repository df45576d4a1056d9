//! This module contains a lightweight, ownership safe sqlite wrapper on top of the sqlite3-sys crate.
//!
//! Native handles are owned by [`handle::Handle`] and released exactly once. Statements borrow
//! their connection, so a connection can not be closed while statements prepared on it are alive.
//! Every failing native call is reported as an [`Exception`] holding the engine's extended result
//! code and message, read from the engine right after the failure.
//!
//! ```no_run
//! use sqlite::{Connection, Reader, Statement};
//!
//! # fn main() -> sqlite::Result<()> {
//! let conn = Connection::memory()?;
//! conn.execute("create table Things (Content)", ())?;
//! conn.execute("insert into Things values (?)", (42,))?;
//!
//! let stmt = Statement::new(&conn, "select Content from Things", ())?;
//! for row in stmt.rows()? {
//!     println!("{}", row?.get_int(0));
//! }
//! # Ok(())
//! # }
//! ```

mod connection;
mod error;
mod ffi;
pub mod handle;
mod row;
mod rowiterator;
mod statement;
mod value;

#[derive(Debug, Copy, Clone)]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
    Create,
}

pub use connection::{Connection, ConnectionHandle, MEMORY};
pub use error::{Exception, Result};
pub use row::{ColumnType, Reader, Row};
pub use rowiterator::{RowIterator, begin, end};
pub use statement::{Statement, StatementHandle, execute};
pub use value::{BindValue, Null, Params, Wide};
