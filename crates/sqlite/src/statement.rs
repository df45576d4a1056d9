use crate::ffi;
use crate::handle::{Handle, HandleTraits};
use crate::value::{BindValue, Params};
use crate::{Connection, Exception, Result, Row, RowIterator};
use std::cell::Cell;
use std::ffi::{CStr, CString, c_double, c_int, c_longlong, c_void};
use std::marker::PhantomData;

#[derive(Debug)]
pub struct StatementHandle;

impl HandleTraits for StatementHandle {
    type Raw = libsqlite3_sys::sqlite3_stmt;

    unsafe fn close(raw: *mut Self::Raw) -> c_int {
        // finalize always releases the statement, a failure code only repeats the last step error
        unsafe { libsqlite3_sys::sqlite3_finalize(raw) };
        libsqlite3_sys::SQLITE_OK
    }
}

/// A prepared statement.
///
/// `'a` covers the connection the statement was prepared on and every borrowed value bound to
/// it, so neither can go away while the statement may still read from them.
///
/// Once a step reports completion the statement stays done: further steps return `false`
/// without running the plan again until [`Statement::reset`] is called.
///
/// Text bound without a copy has to live as long as the statement, not just the bind call:
///
/// ```compile_fail
/// use sqlite::{Connection, Statement};
///
/// let conn = Connection::memory().unwrap();
/// let stmt = Statement::new(&conn, "select ?", ()).unwrap();
/// {
///     let text = String::from("dropped before the step");
///     stmt.bind(1, text.as_str()).unwrap();
/// }
/// stmt.step().unwrap();
/// ```
///
/// The same holds for blobs:
///
/// ```compile_fail
/// use sqlite::{Connection, Statement};
///
/// let conn = Connection::memory().unwrap();
/// let stmt = Statement::new(&conn, "select ?", ()).unwrap();
/// {
///     let data = vec![1u8, 2, 3];
///     stmt.bind_blob(1, &data).unwrap();
/// }
/// stmt.step().unwrap();
/// ```
///
/// A connection can not be dropped while a statement prepared on it is still alive:
///
/// ```compile_fail
/// use sqlite::{Connection, Statement};
///
/// let conn = Connection::memory().unwrap();
/// let stmt = Statement::new(&conn, "select 1", ()).unwrap();
/// stmt.step().unwrap();
/// drop(conn);
/// ```
#[derive(Debug, Default)]
pub struct Statement<'a> {
    handle: Handle<StatementHandle>,
    generation: Cell<u64>,
    done: Cell<bool>,
    // invariant, so binding borrowed data can never shrink the lifetime below the statement's own
    _bound: PhantomData<Cell<&'a Connection>>,
}

impl Drop for Statement<'_> {
    fn drop(&mut self) {
        // finalize while the connection borrow is still alive
        self.handle.reset();
    }
}

impl<'a> Statement<'a> {
    /// Prepares `sql` on `connection` and binds `params` to parameters `1..=n`.
    pub fn new<P: Params<'a>>(connection: &'a Connection, sql: &str, params: P) -> Result<Self> {
        let mut stmt = Statement::default();
        stmt.prepare(connection, sql, params)?;
        Ok(stmt)
    }

    pub fn new_wide<P: Params<'a>>(connection: &'a Connection, sql: &[u16], params: P) -> Result<Self> {
        let mut stmt = Statement::default();
        stmt.prepare_wide(connection, sql, params)?;
        Ok(stmt)
    }

    /// Replaces the current plan (if any) with `sql` and binds `params`.
    ///
    /// A compile failure is reported from the connection's error state, a bind failure from the
    /// statement's own. Binding stops at the first failure.
    pub fn prepare<P: Params<'a>>(&mut self, connection: &'a Connection, sql: &str, params: P) -> Result<()> {
        log::debug!("Prepare: {sql}");
        let c_sql = CString::new(sql)?;
        self.internal_prepare(
            connection,
            |db, slot| unsafe { libsqlite3_sys::sqlite3_prepare_v2(db, c_sql.as_ptr(), -1, slot, std::ptr::null_mut()) },
            params,
        )
    }

    pub fn prepare_wide<P: Params<'a>>(&mut self, connection: &'a Connection, sql: &[u16], params: P) -> Result<()> {
        log::debug!("Prepare: {}", String::from_utf16_lossy(sql));
        let byte_count = text_length(std::mem::size_of_val(sql))?;
        self.internal_prepare(
            connection,
            |db, slot| unsafe {
                ffi::sqlite3_prepare16_v2(
                    db,
                    sql.as_ptr().cast::<c_void>(),
                    byte_count,
                    slot,
                    std::ptr::null_mut(),
                )
            },
            params,
        )
    }

    fn internal_prepare<P: Params<'a>>(
        &mut self,
        connection: &'a Connection,
        prepare: impl FnOnce(*mut libsqlite3_sys::sqlite3, &mut *mut libsqlite3_sys::sqlite3_stmt) -> c_int,
        params: P,
    ) -> Result<()> {
        self.handle.reset();
        self.restart();

        if !connection.is_open() {
            log::warn!("Prepare on a connection that is not open");
            return Err(Exception::from_code(libsqlite3_sys::SQLITE_MISUSE));
        }

        if prepare(connection.abi(), self.handle.set()) != libsqlite3_sys::SQLITE_OK {
            return Err(connection.last_error());
        }

        self.bind_all(params)
    }

    /// Compiles the first statement of `sql` and returns it with the number of bytes consumed.
    /// The returned statement is empty when the remainder only holds whitespace or comments.
    pub(crate) fn prepare_prefix(connection: &'a Connection, sql: &CStr) -> Result<(Self, usize)> {
        if !connection.is_open() {
            return Err(Exception::from_code(libsqlite3_sys::SQLITE_MISUSE));
        }

        let mut stmt = Statement::default();
        let mut tail: *const std::ffi::c_char = std::ptr::null();
        let rc = unsafe {
            libsqlite3_sys::sqlite3_prepare_v2(connection.abi(), sql.as_ptr(), -1, stmt.handle.set(), &mut tail)
        };
        if rc != libsqlite3_sys::SQLITE_OK {
            return Err(connection.last_error());
        }

        let consumed = if tail.is_null() {
            sql.to_bytes().len()
        } else {
            tail as usize - sql.as_ptr() as usize
        };

        Ok((stmt, consumed))
    }

    pub fn is_valid(&self) -> bool {
        self.handle.is_valid()
    }

    pub fn abi(&self) -> *mut libsqlite3_sys::sqlite3_stmt {
        self.handle.get()
    }

    pub fn last_error(&self) -> Exception {
        if !self.is_valid() {
            return Exception::from_code(libsqlite3_sys::SQLITE_MISUSE);
        }

        Exception::from_connection(unsafe { libsqlite3_sys::sqlite3_db_handle(self.abi()) })
    }

    pub fn parameter_count(&self) -> c_int {
        unsafe { libsqlite3_sys::sqlite3_bind_parameter_count(self.abi()) }
    }

    pub fn bind_all<P: Params<'a>>(&self, params: P) -> Result<()> {
        params.bind_params(self)
    }

    pub fn bind<V: BindValue<'a>>(&self, index: c_int, value: V) -> Result<()> {
        value.bind_to(self, index)
    }

    pub fn bind_int(&self, index: c_int, value: c_int) -> Result<()> {
        self.check_rc(unsafe { libsqlite3_sys::sqlite3_bind_int(self.abi(), index, value) })
    }

    pub fn bind_int64(&self, index: c_int, value: c_longlong) -> Result<()> {
        self.check_rc(unsafe { libsqlite3_sys::sqlite3_bind_int64(self.abi(), index, value) })
    }

    pub fn bind_double(&self, index: c_int, value: c_double) -> Result<()> {
        self.check_rc(unsafe { libsqlite3_sys::sqlite3_bind_double(self.abi(), index, value) })
    }

    pub fn bind_null(&self, index: c_int) -> Result<()> {
        self.check_rc(unsafe { libsqlite3_sys::sqlite3_bind_null(self.abi(), index) })
    }

    /// Binds text that outlives the statement, the engine keeps a pointer to it.
    pub fn bind_text(&self, index: c_int, value: &'a str) -> Result<()> {
        let size = text_length(value.len())?;
        self.check_rc(unsafe {
            libsqlite3_sys::sqlite3_bind_text(
                self.abi(),
                index,
                value.as_ptr().cast(),
                size,
                libsqlite3_sys::SQLITE_STATIC(),
            )
        })
    }

    pub fn bind_cstr(&self, index: c_int, value: &'a CStr) -> Result<()> {
        self.check_rc(unsafe {
            libsqlite3_sys::sqlite3_bind_text(self.abi(), index, value.as_ptr(), -1, libsqlite3_sys::SQLITE_STATIC())
        })
    }

    /// Binds text that is about to be dropped, the engine copies it.
    pub fn bind_text_owned(&self, index: c_int, value: String) -> Result<()> {
        let size = text_length(value.len())?;
        self.check_rc(unsafe {
            libsqlite3_sys::sqlite3_bind_text(
                self.abi(),
                index,
                value.as_ptr().cast(),
                size,
                libsqlite3_sys::SQLITE_TRANSIENT(),
            )
        })
    }

    pub fn bind_wide(&self, index: c_int, value: &'a [u16]) -> Result<()> {
        let size = text_length(std::mem::size_of_val(value))?;
        self.check_rc(unsafe {
            ffi::sqlite3_bind_text16(
                self.abi(),
                index,
                value.as_ptr().cast::<c_void>(),
                size,
                libsqlite3_sys::SQLITE_STATIC(),
            )
        })
    }

    pub fn bind_wide_owned(&self, index: c_int, value: Vec<u16>) -> Result<()> {
        let size = text_length(std::mem::size_of_val(value.as_slice()))?;
        self.check_rc(unsafe {
            ffi::sqlite3_bind_text16(
                self.abi(),
                index,
                value.as_ptr().cast::<c_void>(),
                size,
                libsqlite3_sys::SQLITE_TRANSIENT(),
            )
        })
    }

    pub fn bind_blob(&self, index: c_int, value: &'a [u8]) -> Result<()> {
        let size = text_length(value.len())?;
        self.check_rc(unsafe {
            libsqlite3_sys::sqlite3_bind_blob(
                self.abi(),
                index,
                value.as_ptr().cast::<c_void>(),
                size,
                libsqlite3_sys::SQLITE_STATIC(),
            )
        })
    }

    pub fn bind_blob_owned(&self, index: c_int, value: Vec<u8>) -> Result<()> {
        let size = text_length(value.len())?;
        self.check_rc(unsafe {
            libsqlite3_sys::sqlite3_bind_blob(
                self.abi(),
                index,
                value.as_ptr().cast::<c_void>(),
                size,
                libsqlite3_sys::SQLITE_TRANSIENT(),
            )
        })
    }

    pub fn clear_bindings(&self) -> Result<()> {
        if !self.is_valid() {
            return Err(Exception::from_code(libsqlite3_sys::SQLITE_MISUSE));
        }

        self.check_rc(unsafe { libsqlite3_sys::sqlite3_clear_bindings(self.abi()) })
    }

    /// Advances to the next row.
    ///
    /// Returns `true` when a row is available and `false` once the statement is done. Any other
    /// outcome, including busy and locked, is returned as an error.
    pub fn step(&self) -> Result<bool> {
        if self.done.get() {
            return Ok(false);
        }

        if !self.is_valid() {
            return Err(Exception::from_code(libsqlite3_sys::SQLITE_MISUSE));
        }

        self.generation.set(self.generation.get().wrapping_add(1));
        match unsafe { libsqlite3_sys::sqlite3_step(self.abi()) } {
            libsqlite3_sys::SQLITE_ROW => Ok(true),
            libsqlite3_sys::SQLITE_DONE => {
                log::trace!("Statement done");
                self.done.set(true);
                Ok(false)
            }
            rc => {
                let err = self.last_error();
                log::trace!("Step failed ({rc}): {err}");
                Err(err)
            }
        }
    }

    /// Steps once for a statement that is not expected to produce rows.
    /// A row that is produced anyway is discarded.
    pub fn execute(&self) -> Result<()> {
        self.step()?;
        Ok(())
    }

    /// Rewinds the statement so it can be stepped again and binds `params`.
    /// Parameters not covered by `params` keep their previous values.
    pub fn reset<P: Params<'a>>(&self, params: P) -> Result<()> {
        // the return code repeats the error of the last step, which was already reported
        unsafe { libsqlite3_sys::sqlite3_reset(self.abi()) };
        self.restart();
        self.bind_all(params)
    }

    pub fn row(&self) -> Row<'_> {
        Row::new(self.abi(), &self.generation)
    }

    pub fn rows(&self) -> Result<RowIterator<'_, 'a>> {
        RowIterator::begin(self)
    }

    fn restart(&self) {
        self.done.set(false);
        self.generation.set(self.generation.get().wrapping_add(1));
    }

    fn check_rc(&self, rc: c_int) -> Result<()> {
        if rc != libsqlite3_sys::SQLITE_OK {
            return Err(self.last_error());
        }

        Ok(())
    }
}

/// Prepares `sql`, binds `params` and executes it once.
pub fn execute<'a, P: Params<'a>>(connection: &'a Connection, sql: &str, params: P) -> Result<()> {
    Statement::new(connection, sql, params)?.execute()
}

fn text_length(len: usize) -> Result<c_int> {
    c_int::try_from(len).map_err(|_| Exception::from_code(libsqlite3_sys::SQLITE_TOOBIG))
}
