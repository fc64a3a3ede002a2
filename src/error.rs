use std::fmt;

pub type AllocResult<T> = Result<T, AllocError>;

/// Why a request was refused before touching the heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidRequest {
  /// Zero bytes were requested.
  ZeroSize,
  /// `zero_allocate` was asked for zero elements.
  ZeroCount,
  /// `count * element_size`, or the size rounding, would wrap around.
  Overflow,
  /// The layout asks for a stricter alignment than the allocator provides.
  Unaligned(usize),
}

/// Failure of one of the allocation entry points.
///
/// A failed call never changes the block list, and every allocation that
/// was live before the call stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
  InvalidRequest(InvalidRequest),
  /// The heap boundary could not be moved far enough.
  ResourceExhausted { requested: usize },
}

impl From<InvalidRequest> for AllocError {
  fn from(reason: InvalidRequest) -> AllocError {
    AllocError::InvalidRequest(reason)
  }
}

impl std::error::Error for AllocError {}

impl fmt::Display for AllocError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter,
  ) -> fmt::Result {
    match self {
      AllocError::InvalidRequest(InvalidRequest::ZeroSize) => {
        write!(f, "invalid request: zero-size allocation")
      }
      AllocError::InvalidRequest(InvalidRequest::ZeroCount) => {
        write!(f, "invalid request: zero element count")
      }
      AllocError::InvalidRequest(InvalidRequest::Overflow) => {
        write!(f, "invalid request: size computation overflows")
      }
      AllocError::InvalidRequest(InvalidRequest::Unaligned(align)) => {
        write!(f, "invalid request: alignment {align} is not supported")
      }
      AllocError::ResourceExhausted { requested } => {
        write!(f, "heap exhausted: could not grow by {requested} bytes")
      }
    }
  }
}

/// Inconsistency found by [`Heap::check`](crate::Heap::check).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapError {
  Corrupt { block: usize, reason: &'static str },
}

impl std::error::Error for HeapError {}

impl fmt::Display for HeapError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter,
  ) -> fmt::Result {
    match self {
      HeapError::Corrupt { block, reason } => {
        write!(f, "corrupt block list at block {block}: {reason}")
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_display() {
    let err: AllocError = InvalidRequest::ZeroSize.into();
    assert_eq!("invalid request: zero-size allocation", err.to_string());

    let err = AllocError::ResourceExhausted { requested: 4096 };
    assert_eq!("heap exhausted: could not grow by 4096 bytes", err.to_string());

    let err = HeapError::Corrupt { block: 3, reason: "tail mismatch" };
    assert_eq!("corrupt block list at block 3: tail mismatch", err.to_string());
  }
}
