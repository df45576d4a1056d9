use crate::ffi;
use crate::handle::{Handle, HandleTraits};
use crate::{AccessMode, Exception, Params, Result, Statement};
use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_int;
use std::path::Path;

pub const MEMORY: &str = ":memory:";

#[derive(Debug)]
pub struct ConnectionHandle;

impl HandleTraits for ConnectionHandle {
    type Raw = libsqlite3_sys::sqlite3;

    unsafe fn close(raw: *mut Self::Raw) -> c_int {
        log::debug!("Close database connection");
        unsafe { libsqlite3_sys::sqlite3_close(raw) }
    }
}

/// An open database, or nothing.
///
/// A connection is either fully open or empty, a failed open never leaves a half constructed
/// connection behind. Statements borrow the connection so it can only be closed once all of
/// them have been finalized.
#[derive(Debug, Default)]
pub struct Connection {
    handle: Handle<ConnectionHandle>,
}

impl Connection {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_mode(db_path, AccessMode::Create)
    }

    pub fn with_mode(db_path: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        let mut conn = Connection::default();
        conn.open_with_mode(db_path, mode)?;
        Ok(conn)
    }

    pub fn new_wide(db_path: &[u16]) -> Result<Self> {
        let mut conn = Connection::default();
        conn.open_wide(db_path)?;
        Ok(conn)
    }

    pub fn memory() -> Result<Self> {
        Self::new(MEMORY)
    }

    pub fn wide_memory() -> Result<Self> {
        Self::new_wide(&MEMORY.encode_utf16().collect::<Vec<u16>>())
    }

    /// Opens `db_path` in place of the current database.
    ///
    /// When the open fails `self` is left untouched, on success the previous database is closed.
    pub fn open(&mut self, db_path: impl AsRef<Path>) -> Result<()> {
        self.open_with_mode(db_path, AccessMode::Create)
    }

    pub fn open_with_mode(&mut self, db_path: impl AsRef<Path>, mode: AccessMode) -> Result<()> {
        let db_path = db_path.as_ref().to_string_lossy().to_string();
        log::debug!("Open database {db_path} ({mode:?})");

        let c_path = CString::new(db_path)?;
        let flags = access_mode_flags(mode);
        self.internal_open(|slot| unsafe {
            libsqlite3_sys::sqlite3_open_v2(c_path.as_ptr(), slot, flags, std::ptr::null())
        })
    }

    pub fn open_wide(&mut self, db_path: &[u16]) -> Result<()> {
        log::debug!("Open database {}", String::from_utf16_lossy(db_path));

        if db_path.contains(&0) {
            return Err(Exception::misuse("Invalid string: nul character in wide path"));
        }

        let mut c_path = db_path.to_vec();
        c_path.push(0);
        self.internal_open(|slot| unsafe { ffi::sqlite3_open16(c_path.as_ptr().cast::<c_void>(), slot) })
    }

    fn internal_open(&mut self, open: impl FnOnce(&mut *mut libsqlite3_sys::sqlite3) -> c_int) -> Result<()> {
        let mut temp = Connection::default();
        if open(temp.handle.set()) != libsqlite3_sys::SQLITE_OK {
            // the failed handle still carries the error, read it before temp closes it
            let err = Exception::from_connection(temp.handle.get());
            log::debug!("Failed to open database: {err}");
            return Err(err);
        }

        std::mem::swap(&mut self.handle, &mut temp.handle);
        Ok(())
    }

    pub fn close(&mut self) {
        self.handle.reset();
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn abi(&self) -> *mut libsqlite3_sys::sqlite3 {
        self.handle.get()
    }

    pub fn last_error(&self) -> Exception {
        if !self.is_open() {
            return Exception::from_code(libsqlite3_sys::SQLITE_MISUSE);
        }

        Exception::from_connection(self.abi())
    }

    /// The filename of the main database, `None` for in-memory or closed connections.
    pub fn path(&self) -> Option<String> {
        if !self.is_open() {
            return None;
        }

        let filename = unsafe { libsqlite3_sys::sqlite3_db_filename(self.abi(), c"main".as_ptr()) };
        if filename.is_null() {
            return None;
        }

        let filename = unsafe { CStr::from_ptr(filename.cast()) }.to_string_lossy().into_owned();
        (!filename.is_empty()).then_some(filename)
    }

    pub fn last_insert_rowid(&self) -> i64 {
        if !self.is_open() {
            return 0;
        }

        unsafe { libsqlite3_sys::sqlite3_last_insert_rowid(self.abi()) }
    }

    pub fn changes(&self) -> usize {
        if !self.is_open() {
            return 0;
        }

        usize::try_from(unsafe { libsqlite3_sys::sqlite3_changes(self.abi()) }).unwrap_or(0)
    }

    pub fn execute<'a, P: Params<'a>>(&'a self, sql: &str, params: P) -> Result<()> {
        crate::execute(self, sql, params)
    }

    /// Runs every statement of a `;` separated script, rows produced by the script are discarded.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        let c_sql = CString::new(sql)?;
        let mut remaining: &CStr = &c_sql;
        while !remaining.is_empty() {
            let (stmt, consumed) = Statement::prepare_prefix(self, remaining)?;
            if stmt.is_valid() {
                while stmt.step()? {}
            }

            let bytes = &remaining.to_bytes_with_nul()[consumed..];
            remaining = CStr::from_bytes_with_nul(bytes).map_err(|e| Exception::misuse(e.to_string()))?;
        }

        Ok(())
    }
}

fn access_mode_flags(mode: AccessMode) -> c_int {
    let flags = match mode {
        AccessMode::ReadOnly => libsqlite3_sys::SQLITE_OPEN_READONLY,
        AccessMode::ReadWrite => libsqlite3_sys::SQLITE_OPEN_READWRITE,
        AccessMode::Create => libsqlite3_sys::SQLITE_OPEN_READWRITE | libsqlite3_sys::SQLITE_OPEN_CREATE,
    };

    flags | libsqlite3_sys::SQLITE_OPEN_URI
}
