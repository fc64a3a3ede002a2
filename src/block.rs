use std::{mem, ptr::NonNull};

use crate::align::ALIGN;

/// Metadata sitting right before every payload handed out by the allocator.
///
/// The alignment forces the header size to a multiple of [`ALIGN`], so a
/// header placed on an aligned address is always followed by an aligned
/// payload.
#[repr(C, align(16))]
pub struct Header {
  pub size: usize,
  pub is_free: bool,
  pub next: *mut Header,
}

pub const HEADER_SIZE: usize = mem::size_of::<Header>();

const _: () = assert!(HEADER_SIZE % ALIGN == 0);

impl Header {
  pub fn new(
    size: usize,
    is_free: bool,
    next: *mut Header,
  ) -> Self {
    Self { size, is_free, next }
  }

  /// # Safety
  ///
  /// `header` must point to a header created by the allocator.
  pub unsafe fn payload(header: *mut Header) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked((header as *mut u8).add(HEADER_SIZE)) }
  }

  /// Recovers the header from a payload pointer.
  ///
  /// # Safety
  ///
  /// `payload` must have been returned by the allocator and not yet released.
  pub unsafe fn from_payload(payload: *mut u8) -> *mut Header {
    unsafe { payload.sub(HEADER_SIZE) as *mut Header }
  }

  /// First byte past the payload.
  ///
  /// # Safety
  ///
  /// `header` must point to a header created by the allocator.
  pub unsafe fn end(header: *mut Header) -> *mut u8 {
    unsafe { (header as *mut u8).add(HEADER_SIZE + (*header).size) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::ptr;

  #[repr(C, align(16))]
  struct Slot([u8; 128]);

  #[test]
  fn test_header_layout() {
    assert_eq!(0, HEADER_SIZE % ALIGN);
    assert_eq!(ALIGN, mem::align_of::<Header>());
  }

  #[test]
  fn test_payload_round_trip() {
    let mut slot = Slot([0; 128]);
    let header = slot.0.as_mut_ptr() as *mut Header;

    unsafe {
      header.write(Header::new(32, false, ptr::null_mut()));

      let payload = Header::payload(header);
      assert_eq!(HEADER_SIZE, payload.as_ptr() as usize - header as usize);
      assert_eq!(header, Header::from_payload(payload.as_ptr()));
      assert_eq!(payload.as_ptr().add(32), Header::end(header));
    }
  }
}
