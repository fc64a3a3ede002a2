//! # brkalloc - A First-Fit Heap Allocator
//!
//! This crate provides a small general-purpose allocator that manages one
//! contiguous heap obtained through the `sbrk` system call (or any other
//! [`HeapBoundary`]), behind a single lock.
//!
//! ## Overview
//!
//! Every allocation becomes a block: a header followed by the payload handed
//! to the caller. Blocks are chained in the order they were created.
//!
//! ```text
//!   First-Fit Allocator Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         HEAP MEMORY                                  │
//!   │                                                                      │
//!   │   ┌──┬─────┬──┬─────┬──┬─────────┬──┬─────┐                          │
//!   │   │H │ A1  │H │free │H │   A3    │H │ A4  │                          │
//!   │   └──┴─────┴──┴─────┴──┴─────────┴──┴─────┘                          │
//!   │    head        ▲                    tail  ▲                          │
//!   │                │                          │                          │
//!   │        first free block            Program Break                     │
//!   │        large enough wins                                             │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   allocate: scan for the first free block that fits, else grow the break.
//!   release:  shrink the break if the block is the last one, else mark free.
//! ```
//!
//! There is no splitting and no coalescing: a reused block keeps its whole
//! size, and its slack is what lets [`Heap::resize`] return the same pointer.
//!
//! ## Crate Structure
//!
//! ```text
//!   brkalloc
//!   ├── align      - ALIGN and the align!/align_offset! macros
//!   ├── block      - Block header layout (internal)
//!   ├── boundary   - HeapBoundary trait, Sbrk and Region backends
//!   ├── error      - AllocError, InvalidRequest, HeapError
//!   ├── heap       - Heap: the unlocked block list
//!   ├── locked     - Allocator: Heap behind a spin lock, GlobalAlloc;
//!   │                SystemHeap: the one allocator over the process break
//!   ├── stats      - HeapStats
//!   └── ffi        - malloc/calloc/realloc/free (feature "c-abi")
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use brkalloc::{Allocator, Region};
//!
//! let allocator = Allocator::new(Region::with_capacity(4096).unwrap());
//!
//! let ptr = allocator.allocate(64).unwrap();
//! unsafe {
//!     ptr.as_ptr().write_bytes(0xAB, 64);
//!     allocator.release(ptr.as_ptr());
//! }
//!
//! assert!(allocator.stats().blocks == 0);
//! ```
//!
//! Installing it as the process allocator:
//!
//! ```rust,ignore
//! use brkalloc::SystemHeap;
//!
//! #[global_allocator]
//! static HEAP: SystemHeap = SystemHeap;
//! ```
//!
//! ## How It Works
//!
//! ```text
//!   Single Allocation:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         User Data              │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ is_free: false  │  │  │                          │  │
//!   │  │ next: null/ptr  │  │  │  N bytes, N % 16 == 0    │  │
//!   │  └─────────────────┘  │  │                          │  │
//!   │   aligned to 16       │  └──────────────────────────┘  │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── Pointer returned to user
//! ```
//!
//! ## Limitations
//!
//! - **One lock**: every operation is serialized.
//! - **Alignment**: at most 16 bytes; stricter layouts are refused.
//! - **Sole owner of the break**: [`SystemHeap`] is the only allocator
//!   built on [`Sbrk`], and nothing else may move the program break, because
//!   `sbrk` itself is not thread safe.
//! - **Unix-only** for [`Sbrk`]; [`Region`] works anywhere.
//!
//! ## Safety
//!
//! Pointers passed to `resize` and `release` must come from the same
//! allocator and still be live. Violations are not detected.

pub mod align;
mod block;
pub mod boundary;
pub mod error;
mod heap;
mod locked;
mod stats;

#[cfg(feature = "c-abi")]
pub mod ffi;

pub use align::ALIGN;
pub use block::HEADER_SIZE;
pub use boundary::{HeapBoundary, Region, Sbrk, program_break};
pub use error::{AllocError, AllocResult, HeapError, InvalidRequest};
pub use heap::{BlockInfo, Blocks, Heap};
pub use locked::{Allocator, SystemHeap};
pub use stats::HeapStats;
