/// Alignment of every header and every payload handed out by the allocator.
pub const ALIGN: usize = 16;

/// Rounds a byte count up to the next multiple of [`ALIGN`].
///
/// The caller is responsible for making sure the addition cannot overflow,
/// see [`checked_align`] for the fallible version.
///
/// # Examples
///
/// ```rust
/// use brkalloc::align;
///
/// assert_eq!(align!(1), 16);
/// assert_eq!(align!(16), 16);
/// assert_eq!(align!(33), 48);
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + $crate::align::ALIGN - 1) & !($crate::align::ALIGN - 1)
  };
}

/// Number of padding bytes needed to move `addr` up to an [`ALIGN`] boundary.
///
/// ```rust
/// use brkalloc::align_offset;
///
/// assert_eq!(align_offset!(0x1000usize), 0);
/// assert_eq!(align_offset!(0x1004usize), 12);
/// ```
#[macro_export]
macro_rules! align_offset {
  ($addr:expr) => {
    $crate::align!($addr) - $addr
  };
}

/// [`align!`] for sizes that come from callers: `None` when rounding up
/// would wrap around.
pub fn checked_align(size: usize) -> Option<usize> {
  size
    .checked_add(ALIGN - 1)
    .map(|padded| padded & !(ALIGN - 1))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_align() {
    let mut alignments = Vec::new();

    for i in 0..10 {
      let sizes = (ALIGN * i + 1)..=(ALIGN * (i + 1));

      let expected_alignment = ALIGN * (i + 1);

      alignments.push((sizes, expected_alignment));
    }

    for (sizes, expected) in alignments {
      for size in sizes {
        assert_eq!(expected, align!(size));
        assert_eq!(Some(expected), checked_align(size));
      }
    }
  }

  #[test]
  fn test_align_offset() {
    let base = 0x4000usize;

    for pad in 0..ALIGN {
      let addr = base - pad;
      assert_eq!(pad, align_offset!(addr));
    }
  }

  #[test]
  fn test_checked_align_overflow() {
    assert_eq!(None, checked_align(usize::MAX));
    assert_eq!(None, checked_align(usize::MAX - 3));
    assert_eq!(Some(0), checked_align(0));
  }
}
