//! Values that can be bound to the positional parameters of a [`Statement`].
//!
//! Borrowed text and blobs are handed to the engine without a copy, the `'a` lifetime of the
//! statement guarantees they outlive every step. Owned values are copied by the engine because
//! they are dropped as soon as the bind call returns.

use crate::{Result, Statement};
use std::ffi::CStr;
use std::os::raw::c_int;

pub trait BindValue<'a> {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()>;
}

/// UTF-16 text, bound through the engine's wide character interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wide<T>(pub T);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Null;

impl<'a> BindValue<'a> for c_int {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_int(index, self)
    }
}

impl<'a> BindValue<'a> for i64 {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_int64(index, self)
    }
}

impl<'a> BindValue<'a> for f64 {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_double(index, self)
    }
}

impl<'a> BindValue<'a> for bool {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_int(index, c_int::from(self))
    }
}

impl<'a> BindValue<'a> for &'a str {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_text(index, self)
    }
}

impl<'a> BindValue<'a> for &'a CStr {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_cstr(index, self)
    }
}

impl<'a> BindValue<'a> for String {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_text_owned(index, self)
    }
}

impl<'a> BindValue<'a> for Wide<&'a [u16]> {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_wide(index, self.0)
    }
}

impl<'a> BindValue<'a> for Wide<Vec<u16>> {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_wide_owned(index, self.0)
    }
}

impl<'a> BindValue<'a> for &'a [u8] {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_blob(index, self)
    }
}

impl<'a> BindValue<'a> for Vec<u8> {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_blob_owned(index, self)
    }
}

impl<'a> BindValue<'a> for Null {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        statement.bind_null(index)
    }
}

impl<'a, T: BindValue<'a>> BindValue<'a> for Option<T> {
    fn bind_to(self, statement: &Statement<'a>, index: c_int) -> Result<()> {
        match self {
            Some(value) => value.bind_to(statement, index),
            None => statement.bind_null(index),
        }
    }
}

/// A list of values bound to parameters `1..=n` in order.
///
/// Binding stops at the first value the engine rejects, later values are not bound.
pub trait Params<'a> {
    fn bind_params(self, statement: &Statement<'a>) -> Result<()>;
}

impl<'a> Params<'a> for () {
    fn bind_params(self, _statement: &Statement<'a>) -> Result<()> {
        Ok(())
    }
}

impl<'a, T: BindValue<'a>, const N: usize> Params<'a> for [T; N] {
    fn bind_params(self, statement: &Statement<'a>) -> Result<()> {
        bind_sequence(statement, self)
    }
}

impl<'a, T: BindValue<'a>> Params<'a> for Vec<T> {
    fn bind_params(self, statement: &Statement<'a>) -> Result<()> {
        bind_sequence(statement, self)
    }
}

fn bind_sequence<'a, T: BindValue<'a>>(statement: &Statement<'a>, values: impl IntoIterator<Item = T>) -> Result<()> {
    for (index, value) in (1..).zip(values) {
        statement.bind(index, value)?;
    }

    Ok(())
}

macro_rules! impl_params_for_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<'a, $($name: BindValue<'a>),+> Params<'a> for ($($name,)+) {
            fn bind_params(self, statement: &Statement<'a>) -> Result<()> {
                $(statement.bind($idx + 1, self.$idx)?;)+
                Ok(())
            }
        }
    };
}

impl_params_for_tuple!(A: 0);
impl_params_for_tuple!(A: 0, B: 1);
impl_params_for_tuple!(A: 0, B: 1, C: 2);
impl_params_for_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_params_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_params_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_params_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_params_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_params_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_params_for_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
