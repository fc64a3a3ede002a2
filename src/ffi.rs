//! `malloc`, `calloc`, `realloc` and `free` for C callers.
//!
//! Linking a crate built with the `c-abi` feature replaces the platform
//! allocator for the whole process. Failures come back as null; `errno` is
//! left alone. `posix_memalign` and friends are not provided, so callers
//! needing more than 16-byte alignment still reach the platform allocator.
//! These functions share one block list and lock with every [`SystemHeap`].

use std::ptr::{self, NonNull};

use libc::{c_void, size_t};

use crate::locked::SystemHeap;

fn into_raw(payload: Option<NonNull<u8>>) -> *mut c_void {
  payload.map_or(ptr::null_mut(), |payload| payload.as_ptr().cast())
}

#[unsafe(no_mangle)]
pub extern "C" fn malloc(size: size_t) -> *mut c_void {
  into_raw(SystemHeap.allocate(size).ok())
}

#[unsafe(no_mangle)]
pub extern "C" fn calloc(
  nmemb: size_t,
  size: size_t,
) -> *mut c_void {
  into_raw(SystemHeap.zero_allocate(nmemb, size).ok())
}

/// # Safety
///
/// `ptr` must be null or come from this module's `malloc`, `calloc` or
/// `realloc` and not have been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn realloc(
  ptr: *mut c_void,
  size: size_t,
) -> *mut c_void {
  into_raw(unsafe { SystemHeap.resize(ptr.cast(), size) }.ok())
}

/// # Safety
///
/// Same contract as [`realloc`]. `ptr` is dead once this returns.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
  unsafe { SystemHeap.release(ptr.cast()) }
}
