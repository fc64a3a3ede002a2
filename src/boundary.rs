//! The heap-boundary primitive the allocator grows and shrinks through.
//!
//! Everything that moves a boundary lives here. The rest of the crate only
//! sees [`HeapBoundary::adjust`].

use std::{alloc, ptr::NonNull};

use libc::{c_void, intptr_t, sbrk};

use crate::{
  align::ALIGN,
  error::{AllocError, AllocResult, InvalidRequest},
};

/// A movable end of a contiguous heap, with `sbrk(2)` semantics.
pub trait HeapBoundary {
  /// Moves the boundary by `delta` bytes and returns where it was before.
  ///
  /// A zero delta only queries the current boundary. `None` means the
  /// boundary could not be moved and nothing changed.
  ///
  /// # Safety
  ///
  /// Shrinking hands memory back; the caller must not touch anything past
  /// the new boundary afterwards.
  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Option<NonNull<u8>>;
}

/// The process break.
///
/// `sbrk` is not thread safe. Only one allocator in the process may own
/// it, so the sole value lives inside [`SystemHeap`](crate::SystemHeap).
/// Nothing else may move the break meanwhile, including the platform
/// `malloc` if it also uses `brk`.
#[derive(Debug)]
pub struct Sbrk {
  _private: (),
}

impl Sbrk {
  pub(crate) const fn new() -> Sbrk {
    Sbrk { _private: () }
  }
}

/// Current program break, without moving it.
pub fn program_break() -> Option<NonNull<u8>> {
  unsafe { Sbrk::new().adjust(0) }
}

impl HeapBoundary for Sbrk {
  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Option<NonNull<u8>> {
    let prior = unsafe { sbrk(delta as intptr_t) };

    if prior == usize::MAX as *mut c_void {
      return None;
    }

    NonNull::new(prior as *mut u8)
  }
}

/// A fixed-capacity heap carved out of one buffer, behaving like a private
/// program break.
///
/// ```text
///   base                  base + brk               base + capacity
///   ┌──────────────────────┬─────────────────────────┐
///   │  handed out so far   │     not yet reached     │
///   └──────────────────────┴─────────────────────────┘
/// ```
pub struct Region {
  base: NonNull<u8>,
  capacity: usize,
  brk: usize,
}

// The buffer is owned exclusively by the region.
unsafe impl Send for Region {}

impl Region {
  /// Reserves `capacity` bytes from the system allocator, aligned to [`ALIGN`].
  pub fn with_capacity(capacity: usize) -> AllocResult<Region> {
    let layout = Self::layout(capacity)?;

    let base = unsafe { alloc::alloc(layout) };
    let base = NonNull::new(base).ok_or(AllocError::ResourceExhausted { requested: capacity })?;

    Ok(Region {
      base,
      capacity,
      brk: 0,
    })
  }

  fn layout(capacity: usize) -> AllocResult<alloc::Layout> {
    alloc::Layout::from_size_align(capacity.max(ALIGN), ALIGN)
      .map_err(|_| AllocError::from(InvalidRequest::Overflow))
  }

  pub fn base(&self) -> NonNull<u8> {
    self.base
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  /// Bytes currently below the boundary.
  pub fn used(&self) -> usize {
    self.brk
  }
}

impl HeapBoundary for Region {
  unsafe fn adjust(
    &mut self,
    delta: isize,
  ) -> Option<NonNull<u8>> {
    let brk = self.brk.checked_add_signed(delta)?;

    if brk > self.capacity {
      return None;
    }

    let prior = unsafe { self.base.add(self.brk) };
    self.brk = brk;

    Some(prior)
  }
}

impl Drop for Region {
  fn drop(&mut self) {
    if let Ok(layout) = Self::layout(self.capacity) {
      unsafe { alloc::dealloc(self.base.as_ptr(), layout) };
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_region_grow_and_shrink() {
    let mut region = Region::with_capacity(256).unwrap();
    let base = region.base();

    unsafe {
      assert_eq!(Some(base), region.adjust(0));
      assert_eq!(Some(base), region.adjust(64));
      assert_eq!(Some(base.add(64)), region.adjust(32));
      assert_eq!(96, region.used());

      assert_eq!(Some(base.add(96)), region.adjust(-32));
      assert_eq!(Some(base.add(64)), region.adjust(0));
    }
  }

  #[test]
  fn test_region_refuses_to_leave_buffer() {
    let mut region = Region::with_capacity(128).unwrap();

    unsafe {
      assert_eq!(None, region.adjust(129));
      assert_eq!(None, region.adjust(-1));
      assert_eq!(0, region.used());

      assert!(region.adjust(128).is_some());
      assert_eq!(None, region.adjust(1));
      assert_eq!(128, region.used());
    }
  }

  #[test]
  fn test_region_is_aligned() {
    let region = Region::with_capacity(100).unwrap();
    assert_eq!(0, region.base().as_ptr() as usize % ALIGN);
  }

  #[test]
  fn test_program_break_query() {
    assert!(program_break().is_some());
  }
}
