use std::{fmt, marker::PhantomData, ptr, ptr::NonNull};

use log::{debug, trace, warn};

use crate::{
  align::{ALIGN, checked_align},
  align_offset,
  block::{HEADER_SIZE, Header},
  boundary::HeapBoundary,
  error::{AllocError, AllocResult, HeapError, InvalidRequest},
  stats::HeapStats,
};

/// Something worth logging that happened to the block list.
///
/// Events are collected while the list is being mutated and logged by the
/// caller afterwards, so a logger that allocates never runs inside the
/// allocator's critical section.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Event {
  Reused { payload: NonNull<u8>, size: usize },
  Grew { payload: NonNull<u8>, size: usize, by: usize },
  Exhausted { requested: usize },
  Retracted { payload: NonNull<u8>, by: usize },
  Marked { payload: NonNull<u8>, size: usize },
}

impl Event {
  pub(crate) fn log(self) {
    match self {
      Event::Reused { payload, size } => {
        trace!("reused free block {payload:?} ({size} bytes)")
      }
      Event::Grew { payload, size, by } => {
        debug!("heap grew by {by} bytes for block {payload:?} ({size} bytes)")
      }
      Event::Exhausted { requested } => {
        warn!("heap boundary refused to grow by {requested} bytes")
      }
      Event::Retracted { payload, by } => {
        debug!("released trailing block {payload:?}, heap shrank by {by} bytes")
      }
      Event::Marked { payload, size } => {
        trace!("marked block {payload:?} free ({size} bytes)")
      }
    }
  }
}

/// Snapshot of one block, as seen by [`Heap::blocks`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  pub payload: NonNull<u8>,
  pub size: usize,
  pub is_free: bool,
}

/// First-fit allocator over a single growable heap.
///
/// Every block ever created stays in a singly linked list in creation order.
/// Released blocks are only marked free, except for the trailing block
/// whose memory goes back through the [`HeapBoundary`].
///
/// ```text
///   head                                          tail        boundary
///   ┌────────┬────────┐┌────────┬──────┐┌────────┬──────────┐  │
///   │ header │  used  ││ header │ free ││ header │   used   │  ▼
///   └────────┴────────┘└────────┴──────┘└────────┴──────────┘
///        └──── next ─────────▲   └── next ──▲
/// ```
///
/// `Heap` is not synchronized; [`Allocator`](crate::Allocator) wraps it in
/// a lock.
pub struct Heap<B> {
  head: *mut Header,
  tail: *mut Header,
  boundary: B,
}

// The headers live inside memory owned through `boundary`.
unsafe impl<B: Send> Send for Heap<B> {}

impl<B: HeapBoundary> Heap<B> {
  pub const fn new(boundary: B) -> Self {
    Self {
      head: ptr::null_mut(),
      tail: ptr::null_mut(),
      boundary,
    }
  }

  pub fn boundary(&self) -> &B {
    &self.boundary
  }

  pub fn is_empty(&self) -> bool {
    self.head.is_null()
  }

  /// Allocates `size` bytes, reusing the first free block large enough or
  /// growing the heap.
  ///
  /// Zero-size requests fail. The recorded block size is `size` rounded up
  /// to [`ALIGN`].
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> AllocResult<NonNull<u8>> {
    self.allocate_with(size, &mut Event::log)
  }

  /// Allocates `count * element_size` zeroed bytes.
  pub fn zero_allocate(
    &mut self,
    count: usize,
    element_size: usize,
  ) -> AllocResult<NonNull<u8>> {
    self.zero_allocate_with(count, element_size, &mut Event::log)
  }

  /// Grows an allocation, moving it only when its block is too small.
  ///
  /// A null `ptr` or a zero `new_size` behaves like [`Heap::allocate`].
  /// On failure the old allocation is left untouched.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a live pointer returned by this heap.
  pub unsafe fn resize(
    &mut self,
    ptr: *mut u8,
    new_size: usize,
  ) -> AllocResult<NonNull<u8>> {
    unsafe { self.resize_with(ptr, new_size, &mut Event::log) }
  }

  /// Gives an allocation back. Null is ignored.
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a live pointer returned by this heap. It must not
  /// be used afterwards.
  pub unsafe fn release(
    &mut self,
    ptr: *mut u8,
  ) {
    unsafe { self.release_with(ptr, &mut Event::log) }
  }

  /// Bytes usable through `ptr`, slack included.
  ///
  /// # Safety
  ///
  /// `ptr` must be a live pointer returned by this heap.
  pub unsafe fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    unsafe { (*Header::from_payload(ptr.as_ptr())).size }
  }

  pub(crate) fn allocate_with(
    &mut self,
    size: usize,
    events: &mut dyn FnMut(Event),
  ) -> AllocResult<NonNull<u8>> {
    if size == 0 {
      return Err(InvalidRequest::ZeroSize.into());
    }

    let size = checked_align(size).ok_or(InvalidRequest::Overflow)?;

    unsafe {
      let free_block = self.find_free_block(size);

      if !free_block.is_null() {
        (*free_block).is_free = false;

        let payload = Header::payload(free_block);
        events(Event::Reused {
          payload,
          size: (*free_block).size,
        });

        return Ok(payload);
      }

      let (block, by) = match self.grow(size) {
        Ok(grown) => grown,
        Err(err) => {
          if let AllocError::ResourceExhausted { requested } = err {
            events(Event::Exhausted { requested });
          }
          return Err(err);
        }
      };

      block.write(Header::new(size, false, ptr::null_mut()));

      if self.head.is_null() {
        self.head = block;
      } else {
        (*self.tail).next = block;
      }
      self.tail = block;

      let payload = Header::payload(block);
      events(Event::Grew { payload, size, by });

      Ok(payload)
    }
  }

  pub(crate) fn zero_allocate_with(
    &mut self,
    count: usize,
    element_size: usize,
    events: &mut dyn FnMut(Event),
  ) -> AllocResult<NonNull<u8>> {
    if count == 0 {
      return Err(InvalidRequest::ZeroCount.into());
    }
    if element_size == 0 {
      return Err(InvalidRequest::ZeroSize.into());
    }
    if element_size >= usize::MAX / count {
      return Err(InvalidRequest::Overflow.into());
    }

    let payload = self.allocate_with(count * element_size, events)?;

    // A reused block still holds whatever its previous owner wrote.
    unsafe {
      let size = self.usable_size(payload);
      ptr::write_bytes(payload.as_ptr(), 0, size);
    }

    Ok(payload)
  }

  pub(crate) unsafe fn resize_with(
    &mut self,
    ptr: *mut u8,
    new_size: usize,
    events: &mut dyn FnMut(Event),
  ) -> AllocResult<NonNull<u8>> {
    let Some(old) = NonNull::new(ptr) else {
      return self.allocate_with(new_size, events);
    };

    if new_size == 0 {
      return self.allocate_with(new_size, events);
    }

    unsafe {
      let old_size = self.usable_size(old);

      if old_size >= new_size {
        return Ok(old);
      }

      let new = self.allocate_with(new_size, events)?;

      // `old` is in use, so first-fit can never hand it out again.
      ptr::copy_nonoverlapping(old.as_ptr(), new.as_ptr(), old_size.min(new_size));
      self.release_with(old.as_ptr(), events);

      Ok(new)
    }
  }

  pub(crate) unsafe fn release_with(
    &mut self,
    ptr: *mut u8,
    events: &mut dyn FnMut(Event),
  ) {
    if ptr.is_null() {
      return;
    }

    unsafe {
      let block = Header::from_payload(ptr);
      let payload = Header::payload(block);
      let size = (*block).size;

      if self.is_trailing(block) {
        let by = HEADER_SIZE + size;

        if self.boundary.adjust(-(by as isize)).is_some() {
          self.unlink_tail();
          events(Event::Retracted { payload, by });
          return;
        }
      }

      (*block).is_free = true;
      events(Event::Marked { payload, size });
    }
  }

  unsafe fn find_free_block(
    &self,
    size: usize,
  ) -> *mut Header {
    unsafe {
      let mut current: *mut Header = self.head;

      while !current.is_null() {
        if (*current).is_free && (*current).size >= size {
          return current;
        }
        current = (*current).next;
      }

      ptr::null_mut()
    }
  }

  /// Extends the heap by one header plus `size` bytes and returns the
  /// uninitialized header slot and how far the boundary moved.
  unsafe fn grow(
    &mut self,
    size: usize,
  ) -> AllocResult<(*mut Header, usize)> {
    let exhausted = |requested| AllocError::ResourceExhausted { requested };

    let block_size = HEADER_SIZE
      .checked_add(size)
      .filter(|total| *total <= isize::MAX as usize)
      .ok_or(exhausted(size))?;

    unsafe {
      let current = self.boundary.adjust(0).ok_or(exhausted(block_size))?;

      // Only happens when something else left the boundary unaligned.
      let pad = align_offset!(current.as_ptr() as usize);

      let total = block_size
        .checked_add(pad)
        .filter(|total| *total <= isize::MAX as usize)
        .ok_or(exhausted(block_size))?;

      let prior = self.boundary.adjust(total as isize).ok_or(exhausted(total))?;

      if align_offset!(prior.as_ptr() as usize) > pad {
        self.boundary.adjust(-(total as isize));
        return Err(exhausted(total));
      }

      let block = prior.as_ptr().add(align_offset!(prior.as_ptr() as usize)) as *mut Header;

      Ok((block, total))
    }
  }

  /// The tail block is trailing when nothing sits between its payload end
  /// and the boundary.
  unsafe fn is_trailing(
    &mut self,
    block: *mut Header,
  ) -> bool {
    if block != self.tail {
      return false;
    }

    unsafe {
      let end = Header::end(block);
      self
        .boundary
        .adjust(0)
        .is_some_and(|boundary| boundary.as_ptr() == end)
    }
  }

  unsafe fn unlink_tail(&mut self) {
    unsafe {
      if self.head == self.tail {
        self.head = ptr::null_mut();
        self.tail = ptr::null_mut();
        return;
      }

      let mut current: *mut Header = self.head;
      while (*current).next != self.tail {
        current = (*current).next;
      }

      (*current).next = ptr::null_mut();
      self.tail = current;
    }
  }
}

impl<B> Heap<B> {
  /// Walks the block list from head to tail.
  pub fn blocks(&self) -> Blocks<'_> {
    Blocks {
      current: self.head,
      _heap: PhantomData,
    }
  }

  pub fn stats(&self) -> HeapStats {
    self.blocks().collect()
  }

  /// Verifies the list invariants and returns the number of blocks.
  ///
  /// Blocks must appear in increasing address order without overlapping,
  /// which also rules out cycles. Gaps between blocks are accepted: they
  /// appear when something else moved the boundary between two growths.
  pub fn check(&self) -> Result<usize, HeapError> {
    let corrupt = |block, reason| Err(HeapError::Corrupt { block, reason });

    if self.head.is_null() || self.tail.is_null() {
      if self.head != self.tail {
        return corrupt(0, "only one of head and tail is set");
      }
      return Ok(0);
    }

    let mut count = 0;
    let mut current = self.head;

    unsafe {
      loop {
        if current as usize % ALIGN != 0 {
          return corrupt(count, "misaligned header");
        }

        let next = (*current).next;
        count += 1;

        if next.is_null() {
          break;
        }
        if (next as *mut u8) < Header::end(current) {
          return corrupt(count, "blocks out of address order");
        }
        current = next;
      }
    }

    if current != self.tail {
      return corrupt(count, "list does not end at tail");
    }

    Ok(count)
  }
}

impl<B> fmt::Debug for Heap<B> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.debug_struct("Heap")
      .field("head", &self.head)
      .field("tail", &self.tail)
      .field("stats", &self.stats())
      .finish()
  }
}

pub struct Blocks<'a> {
  current: *mut Header,
  _heap: PhantomData<&'a Header>,
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    if self.current.is_null() {
      return None;
    }

    unsafe {
      let block = self.current;
      self.current = (*block).next;

      Some(BlockInfo {
        payload: Header::payload(block),
        size: (*block).size,
        is_free: (*block).is_free,
      })
    }
  }
}
