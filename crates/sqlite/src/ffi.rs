//! UTF-16 entry points of the sqlite C API.
//!
//! libsqlite3-sys leaves every `*16` function out of its generated bindings, the bundled library
//! still exports them.

use libsqlite3_sys::{sqlite3, sqlite3_destructor_type, sqlite3_stmt};
use std::ffi::{c_int, c_void};

unsafe extern "C" {
    pub fn sqlite3_open16(filename: *const c_void, db: *mut *mut sqlite3) -> c_int;

    pub fn sqlite3_prepare16_v2(
        db: *mut sqlite3,
        sql: *const c_void,
        byte_count: c_int,
        stmt: *mut *mut sqlite3_stmt,
        tail: *mut *const c_void,
    ) -> c_int;

    pub fn sqlite3_bind_text16(
        stmt: *mut sqlite3_stmt,
        index: c_int,
        value: *const c_void,
        byte_count: c_int,
        destructor: sqlite3_destructor_type,
    ) -> c_int;

    pub fn sqlite3_column_text16(stmt: *mut sqlite3_stmt, column: c_int) -> *const c_void;

    pub fn sqlite3_column_bytes16(stmt: *mut sqlite3_stmt, column: c_int) -> c_int;
}
