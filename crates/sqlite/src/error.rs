use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use thiserror::Error;

/// Snapshot of the native error state: the extended result code and its message.
///
/// It is captured from the connection at the moment a native call reports failure, so it must be
/// created before any other call on the same connection can overwrite that state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} ({code})")]
pub struct Exception {
    code: c_int,
    message: String,
}

pub type Result<T = ()> = std::result::Result<T, Exception>;

impl Exception {
    pub fn new(code: c_int, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Reads the current extended error code and message of `db`.
    pub(crate) fn from_connection(db: *mut libsqlite3_sys::sqlite3) -> Self {
        let code = unsafe { libsqlite3_sys::sqlite3_extended_errcode(db) };
        let message = unsafe { message_from_ptr(libsqlite3_sys::sqlite3_errmsg(db)) };
        Self { code, message }
    }

    pub(crate) fn from_code(code: c_int) -> Self {
        let message = unsafe { message_from_ptr(libsqlite3_sys::sqlite3_errstr(code)) };
        Self { code, message }
    }

    pub(crate) fn misuse(message: impl Into<String>) -> Self {
        Self::new(libsqlite3_sys::SQLITE_MISUSE, message)
    }

    pub fn code(&self) -> c_int {
        self.code
    }

    /// The primary result code (the low byte of the extended code).
    pub fn primary_code(&self) -> c_int {
        self.code & 0xff
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_busy(&self) -> bool {
        self.primary_code() == libsqlite3_sys::SQLITE_BUSY
    }

    pub fn is_locked(&self) -> bool {
        self.primary_code() == libsqlite3_sys::SQLITE_LOCKED
    }
}

impl From<std::ffi::NulError> for Exception {
    fn from(err: std::ffi::NulError) -> Self {
        Exception::misuse(format!("Invalid string: {err}"))
    }
}

/// Copies a native, nul terminated message.
///
/// # Safety
/// `ptr` must be null or point to a valid nul terminated string.
pub(crate) unsafe fn message_from_ptr(ptr: *const c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }

    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
