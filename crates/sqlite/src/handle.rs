//! Generic ownership of a single native resource pointer.
//!
//! A [`Handle`] owns at most one raw pointer and releases it exactly once, through the
//! [`HandleTraits::close`] function of its policy type. Rust moves are destructive so a handle
//! can never be duplicated, assigning over a handle drops (and closes) the previous value first.

use std::fmt;
use std::os::raw::c_int;

/// Describes how a native resource of type [`HandleTraits::Raw`] is released.
pub trait HandleTraits {
    type Raw;

    /// Releases the resource and returns the native result code.
    ///
    /// # Safety
    /// `raw` must be a non-null pointer that was obtained from the matching native constructor
    /// and that has not been released yet.
    unsafe fn close(raw: *mut Self::Raw) -> c_int;
}

pub struct Handle<T: HandleTraits> {
    raw: *mut T::Raw,
}

impl<T: HandleTraits> Handle<T> {
    pub const fn empty() -> Self {
        Self {
            raw: std::ptr::null_mut(),
        }
    }

    /// Takes ownership of `raw`, which may be null.
    ///
    /// # Safety
    /// A non-null `raw` must satisfy the requirements of [`HandleTraits::close`] and must not be
    /// owned by any other handle.
    pub unsafe fn from_raw(raw: *mut T::Raw) -> Self {
        Self { raw }
    }

    pub fn get(&self) -> *mut T::Raw {
        self.raw
    }

    /// Returns the slot a native constructor writes the new resource into.
    /// Any resource owned so far is released first.
    pub fn set(&mut self) -> &mut *mut T::Raw {
        self.reset();
        &mut self.raw
    }

    pub fn is_valid(&self) -> bool {
        !self.raw.is_null()
    }

    pub fn reset(&mut self) {
        // null the slot before closing so a panicking close can never lead to a second release
        let raw = std::mem::replace(&mut self.raw, std::ptr::null_mut());
        close_raw::<T>(raw);
    }

    pub fn release(&mut self) -> *mut T::Raw {
        std::mem::replace(&mut self.raw, std::ptr::null_mut())
    }
}

fn close_raw<T: HandleTraits>(raw: *mut T::Raw) {
    if raw.is_null() {
        return;
    }

    let rc = unsafe { T::close(raw) };
    debug_assert_eq!(rc, libsqlite3_sys::SQLITE_OK, "Failed to release native handle");
    if rc != libsqlite3_sys::SQLITE_OK {
        log::warn!("Native handle release returned {rc}");
    }
}

impl<T: HandleTraits> Default for Handle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: HandleTraits> Drop for Handle<T> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: HandleTraits> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Handle").field(&self.raw).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    thread_local! {
        static CLOSED: RefCell<Vec<u32>> = const { RefCell::new(Vec::new()) };
    }

    struct CountingTraits;

    impl HandleTraits for CountingTraits {
        type Raw = u32;

        unsafe fn close(raw: *mut u32) -> c_int {
            let value = unsafe { Box::from_raw(raw) };
            CLOSED.with(|closed| closed.borrow_mut().push(*value));
            libsqlite3_sys::SQLITE_OK
        }
    }

    type CountingHandle = Handle<CountingTraits>;

    fn resource(id: u32) -> CountingHandle {
        unsafe { CountingHandle::from_raw(Box::into_raw(Box::new(id))) }
    }

    fn closed() -> Vec<u32> {
        CLOSED.with(|closed| closed.borrow().clone())
    }

    #[test_log::test]
    fn empty_handle_releases_nothing() {
        let handle = CountingHandle::default();
        assert!(!handle.is_valid());
        assert!(handle.get().is_null());
        drop(handle);
        assert!(closed().is_empty());
    }

    #[test_log::test]
    fn drop_releases_once() {
        {
            let handle = resource(1);
            assert!(handle.is_valid());
        }
        assert_eq!(closed(), vec![1]);
    }

    #[test_log::test]
    fn moves_release_once_at_last_owner() {
        let first = resource(1);
        let second = first;
        let mut holder = vec![second];
        assert!(closed().is_empty());

        let third = holder.pop().unwrap();
        assert!(closed().is_empty());
        drop(third);
        assert_eq!(closed(), vec![1]);
    }

    #[test_log::test]
    fn reassignment_releases_previous_resource() {
        let mut target = resource(1);
        let source = resource(2);

        target = source;
        assert_eq!(closed(), vec![1]);
        assert!(target.is_valid());

        drop(target);
        assert_eq!(closed(), vec![1, 2]);
    }

    #[test_log::test]
    fn swap_keeps_both_alive() {
        let mut a = resource(1);
        let mut b = CountingHandle::empty();
        std::mem::swap(&mut a, &mut b);

        assert!(!a.is_valid());
        assert!(b.is_valid());
        drop(a);
        assert!(closed().is_empty());
        drop(b);
        assert_eq!(closed(), vec![1]);
    }

    #[test_log::test]
    fn set_releases_before_handing_out_slot() {
        let mut handle = resource(1);
        let slot = handle.set();
        assert!(slot.is_null());
        *slot = Box::into_raw(Box::new(7));
        assert_eq!(closed(), vec![1]);

        handle.reset();
        assert_eq!(closed(), vec![1, 7]);
        handle.reset();
        assert_eq!(closed(), vec![1, 7]);
    }

    #[test_log::test]
    fn release_gives_up_ownership() {
        let mut handle = resource(3);
        let raw = handle.release();
        assert!(!handle.is_valid());
        drop(handle);
        assert!(closed().is_empty());

        drop(unsafe { CountingHandle::from_raw(raw) });
        assert_eq!(closed(), vec![3]);
    }
}
