use crate::Statement;
use crate::error::message_from_ptr;
use crate::ffi;
use std::cell::Cell;
use std::ffi::{c_double, c_int, c_longlong};
use std::slice;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Blob,
    Null,
    Text,
}

mod sealed {
    pub trait ColumnSource {
        fn column_source(&self) -> *mut libsqlite3_sys::sqlite3_stmt;
    }
}

/// Reads column values of the current row. Column indexes are zero based.
///
/// Reading a column index that is out of range, or reading when no row is current, returns
/// whatever the engine returns for that case (zero, NULL or an empty value).
pub trait Reader: sealed::ColumnSource {
    fn get_int(&self, column: c_int) -> c_int {
        unsafe { libsqlite3_sys::sqlite3_column_int(self.column_source(), column) }
    }

    fn get_int64(&self, column: c_int) -> c_longlong {
        unsafe { libsqlite3_sys::sqlite3_column_int64(self.column_source(), column) }
    }

    fn get_double(&self, column: c_int) -> c_double {
        unsafe { libsqlite3_sys::sqlite3_column_double(self.column_source(), column) }
    }

    fn get_string(&self, column: c_int) -> Option<String> {
        let stmt = self.column_source();
        let data = unsafe { libsqlite3_sys::sqlite3_column_text(stmt, column) };
        if data.is_null() {
            return None;
        }

        let size = unsafe { libsqlite3_sys::sqlite3_column_bytes(stmt, column) };
        let bytes = unsafe { slice::from_raw_parts(data, usize::try_from(size).unwrap_or(0)) };
        Some(String::from_utf8_lossy(bytes).into_owned())
    }

    fn get_wide_string(&self, column: c_int) -> Option<Vec<u16>> {
        let stmt = self.column_source();
        let data = unsafe { ffi::sqlite3_column_text16(stmt, column) };
        if data.is_null() {
            return None;
        }

        let size = unsafe { ffi::sqlite3_column_bytes16(stmt, column) };
        let len = usize::try_from(size).unwrap_or(0) / std::mem::size_of::<u16>();
        Some(unsafe { slice::from_raw_parts(data.cast::<u16>(), len) }.to_vec())
    }

    fn get_string_length(&self, column: c_int) -> c_int {
        unsafe { libsqlite3_sys::sqlite3_column_bytes(self.column_source(), column) }
    }

    /// Length of the column in UTF-16 code units.
    fn get_wide_string_length(&self, column: c_int) -> c_int {
        let bytes = unsafe { ffi::sqlite3_column_bytes16(self.column_source(), column) };
        bytes / std::mem::size_of::<u16>() as c_int
    }

    /// The column as a blob, `None` for NULL or an empty blob.
    fn get_blob(&self, column: c_int) -> Option<Vec<u8>> {
        let stmt = self.column_source();
        let data = unsafe { libsqlite3_sys::sqlite3_column_blob(stmt, column) };
        let size = unsafe { libsqlite3_sys::sqlite3_column_bytes(stmt, column) };
        if data.is_null() || size <= 0 {
            return None;
        }

        Some(unsafe { slice::from_raw_parts(data.cast::<u8>(), size as usize) }.to_vec())
    }

    fn column_type(&self, column: c_int) -> ColumnType {
        match unsafe { libsqlite3_sys::sqlite3_column_type(self.column_source(), column) } {
            libsqlite3_sys::SQLITE_INTEGER => ColumnType::Integer,
            libsqlite3_sys::SQLITE_FLOAT => ColumnType::Float,
            libsqlite3_sys::SQLITE_BLOB => ColumnType::Blob,
            libsqlite3_sys::SQLITE_TEXT => ColumnType::Text,
            _ => ColumnType::Null,
        }
    }

    fn column_is_null(&self, column: c_int) -> bool {
        self.column_type(column) == ColumnType::Null
    }

    fn column_count(&self) -> c_int {
        unsafe { libsqlite3_sys::sqlite3_column_count(self.column_source()) }
    }

    fn column_name(&self, column: c_int) -> Option<String> {
        let stmt = self.column_source();
        if stmt.is_null() {
            return None;
        }

        let name = unsafe { libsqlite3_sys::sqlite3_column_name(stmt, column) };
        (!name.is_null()).then(|| unsafe { message_from_ptr(name) })
    }
}

/// Non owning view of the current row of a statement.
///
/// The view is only meaningful until its statement is stepped again. Debug builds check this
/// on every read.
#[derive(Clone, Copy)]
pub struct Row<'s> {
    stmt: *mut libsqlite3_sys::sqlite3_stmt,
    generation: u64,
    source: &'s Cell<u64>,
}

impl<'s> Row<'s> {
    pub(crate) fn new(stmt: *mut libsqlite3_sys::sqlite3_stmt, source: &'s Cell<u64>) -> Self {
        Self {
            stmt,
            generation: source.get(),
            source,
        }
    }

    pub fn abi(&self) -> *mut libsqlite3_sys::sqlite3_stmt {
        self.stmt
    }

    pub fn is_current(&self) -> bool {
        self.source.get() == self.generation
    }
}

impl std::fmt::Debug for Row<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("stmt", &self.stmt)
            .field("current", &self.is_current())
            .finish()
    }
}

impl sealed::ColumnSource for Row<'_> {
    fn column_source(&self) -> *mut libsqlite3_sys::sqlite3_stmt {
        debug_assert!(self.is_current(), "Row read after its statement was stepped");
        self.stmt
    }
}

impl Reader for Row<'_> {}

impl sealed::ColumnSource for Statement<'_> {
    fn column_source(&self) -> *mut libsqlite3_sys::sqlite3_stmt {
        self.abi()
    }
}

impl Reader for Statement<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Connection, Result, Wide};

    #[test_log::test]
    fn column_types() -> Result<()> {
        let conn = Connection::memory()?;
        let stmt = Statement::new(&conn, "select 1, 1.5, 'text', x'0102', null", ())?;
        assert!(stmt.step()?);

        assert_eq!(stmt.column_count(), 5);
        assert_eq!(stmt.column_type(0), ColumnType::Integer);
        assert_eq!(stmt.column_type(1), ColumnType::Float);
        assert_eq!(stmt.column_type(2), ColumnType::Text);
        assert_eq!(stmt.column_type(3), ColumnType::Blob);
        assert_eq!(stmt.column_type(4), ColumnType::Null);
        assert!(stmt.column_is_null(4));
        Ok(())
    }

    #[test_log::test]
    fn null_columns_read_as_none() -> Result<()> {
        let conn = Connection::memory()?;
        let stmt = Statement::new(&conn, "select null", ())?;
        assert!(stmt.step()?);

        assert_eq!(stmt.get_int(0), 0);
        assert_eq!(stmt.get_string(0), None);
        assert_eq!(stmt.get_wide_string(0), None);
        assert_eq!(stmt.get_blob(0), None);
        assert_eq!(stmt.get_string_length(0), 0);
        Ok(())
    }

    #[test_log::test]
    fn string_lengths() -> Result<()> {
        let conn = Connection::memory()?;
        let stmt = Statement::new(&conn, "select ?", ("h\u{e9}llo",))?;
        assert!(stmt.step()?);

        assert_eq!(stmt.get_string_length(0), 6);
        assert_eq!(stmt.get_wide_string_length(0), 5);
        Ok(())
    }

    #[test_log::test]
    fn wide_text_round_trips_through_column() -> Result<()> {
        let conn = Connection::memory()?;
        let text: Vec<u16> = "\u{1F600} smile".encode_utf16().collect();
        let stmt = Statement::new(&conn, "select ?", (Wide(text.as_slice()),))?;
        assert!(stmt.step()?);

        assert_eq!(stmt.get_wide_string(0), Some(text.clone()));
        assert_eq!(stmt.get_string(0).as_deref(), Some("\u{1F600} smile"));
        Ok(())
    }

    #[test_log::test]
    fn column_names() -> Result<()> {
        let conn = Connection::memory()?;
        let stmt = Statement::new(&conn, "select 1 as first, 2 as second", ())?;
        assert_eq!(stmt.column_name(0).as_deref(), Some("first"));
        assert_eq!(stmt.column_name(1).as_deref(), Some("second"));
        assert_eq!(stmt.column_name(2), None);

        assert_eq!(Statement::default().column_name(0), None);
        Ok(())
    }

    #[test_log::test]
    fn row_reads_the_current_statement_row() -> Result<()> {
        let conn = Connection::memory()?;
        let stmt = Statement::new(&conn, "select 7, 'seven'", ())?;
        assert!(stmt.step()?);

        let row = stmt.row();
        assert!(row.is_current());
        assert_eq!(row.abi(), stmt.abi());
        assert_eq!(row.get_int(0), 7);
        assert_eq!(row.get_string(1).as_deref(), Some("seven"));

        assert!(!stmt.step()?);
        assert!(!row.is_current());
        Ok(())
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "Row read after its statement was stepped")]
    fn stale_row_read_panics_in_debug() {
        let conn = Connection::memory().unwrap();
        let stmt = Statement::new(&conn, "select 1 union all select 2", ()).unwrap();
        assert!(stmt.step().unwrap());
        let row = stmt.row();
        assert!(stmt.step().unwrap());
        row.get_int(0);
    }
}
