use std::{
  alloc::{GlobalAlloc, Layout},
  cell::Cell,
  fmt,
  ops::Deref,
  ptr::{self, NonNull},
};

use spin::Mutex;

use crate::{
  align::ALIGN,
  boundary::{HeapBoundary, Sbrk},
  error::{AllocResult, HeapError, InvalidRequest},
  heap::{Event, Heap},
  stats::HeapStats,
};

thread_local! {
  /// Set while this thread is inside a logger called from [`Journal::flush`].
  static LOGGING: Cell<bool> = const { Cell::new(false) };
}

/// Clears [`LOGGING`] even if the logger panics.
struct Reentry;

impl Reentry {
  fn enter() -> Option<Reentry> {
    let first = LOGGING.try_with(|logging| !logging.replace(true)).ok()?;
    first.then_some(Reentry)
  }
}

impl Drop for Reentry {
  fn drop(&mut self) {
    let _ = LOGGING.try_with(|logging| logging.set(false));
  }
}

/// Events of a single call: resize is the only one producing two.
#[derive(Default)]
struct Journal {
  events: [Option<Event>; 2],
}

impl Journal {
  fn push(
    &mut self,
    event: Event,
  ) {
    if let Some(slot) = self.events.iter_mut().find(|slot| slot.is_none()) {
      *slot = Some(event);
    }
  }

  /// Logs the events, unless the logger itself allocated through an
  /// allocator on this thread: those nested events are dropped.
  fn flush(self) {
    let Some(_reentry) = Reentry::enter() else {
      return;
    };

    self.events.into_iter().flatten().for_each(Event::log);
  }
}

/// A [`Heap`] behind one lock, usable from any number of threads.
///
/// Every operation holds the lock from the list search to the last header
/// update, including the boundary call. Logging happens after the lock is
/// released, and allocations made by the logger are not logged.
///
/// For the process break use [`SystemHeap`], which shares one allocator
/// across the whole process.
pub struct Allocator<B> {
  heap: Mutex<Heap<B>>,
}

static SYSTEM: Allocator<Sbrk> = Allocator::new(Sbrk::new());

/// Handle to the single allocator growing the process break.
///
/// Every `SystemHeap` value shares the same block list and lock, so the
/// break is only ever moved under one lock by this crate.
///
/// ```rust,ignore
/// use brkalloc::SystemHeap;
///
/// #[global_allocator]
/// static HEAP: SystemHeap = SystemHeap;
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemHeap;

impl Deref for SystemHeap {
  type Target = Allocator<Sbrk>;

  fn deref(&self) -> &Allocator<Sbrk> {
    &SYSTEM
  }
}

unsafe impl GlobalAlloc for SystemHeap {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    unsafe { SYSTEM.alloc(layout) }
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    unsafe { SYSTEM.alloc_zeroed(layout) }
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
  ) {
    unsafe { SYSTEM.dealloc(ptr, layout) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    unsafe { SYSTEM.realloc(ptr, layout, new_size) }
  }
}

impl<B: HeapBoundary> Allocator<B> {
  pub const fn new(boundary: B) -> Self {
    Allocator {
      heap: Mutex::new(Heap::new(boundary)),
    }
  }

  /// See [`Heap::allocate`].
  pub fn allocate(
    &self,
    size: usize,
  ) -> AllocResult<NonNull<u8>> {
    let mut journal = Journal::default();
    let result = self.heap.lock().allocate_with(size, &mut |event| journal.push(event));
    journal.flush();
    result
  }

  /// See [`Heap::zero_allocate`].
  pub fn zero_allocate(
    &self,
    count: usize,
    element_size: usize,
  ) -> AllocResult<NonNull<u8>> {
    let mut journal = Journal::default();
    let result = self
      .heap
      .lock()
      .zero_allocate_with(count, element_size, &mut |event| journal.push(event));
    journal.flush();
    result
  }

  /// See [`Heap::resize`].
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a live pointer returned by this allocator.
  pub unsafe fn resize(
    &self,
    ptr: *mut u8,
    new_size: usize,
  ) -> AllocResult<NonNull<u8>> {
    let mut journal = Journal::default();
    let result = unsafe {
      self
        .heap
        .lock()
        .resize_with(ptr, new_size, &mut |event| journal.push(event))
    };
    journal.flush();
    result
  }

  /// See [`Heap::release`].
  ///
  /// # Safety
  ///
  /// `ptr` must be null or a live pointer returned by this allocator, and
  /// must not be used afterwards.
  pub unsafe fn release(
    &self,
    ptr: *mut u8,
  ) {
    let mut journal = Journal::default();
    unsafe {
      self
        .heap
        .lock()
        .release_with(ptr, &mut |event| journal.push(event))
    };
    journal.flush();
  }

  /// See [`Heap::usable_size`].
  ///
  /// # Safety
  ///
  /// `ptr` must be a live pointer returned by this allocator.
  pub unsafe fn usable_size(
    &self,
    ptr: NonNull<u8>,
  ) -> usize {
    unsafe { self.heap.lock().usable_size(ptr) }
  }

  pub fn stats(&self) -> HeapStats {
    self.heap.lock().stats()
  }

  pub fn check(&self) -> Result<usize, HeapError> {
    self.heap.lock().check()
  }


  fn check_layout(layout: &Layout) -> AllocResult<()> {
    if layout.align() > ALIGN {
      return Err(InvalidRequest::Unaligned(layout.align()).into());
    }
    Ok(())
  }
}

unsafe impl<B: HeapBoundary + Send> GlobalAlloc for Allocator<B> {
  unsafe fn alloc(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    Self::check_layout(&layout)
      .and_then(|()| self.allocate(layout.size()))
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn alloc_zeroed(
    &self,
    layout: Layout,
  ) -> *mut u8 {
    Self::check_layout(&layout)
      .and_then(|()| self.zero_allocate(1, layout.size()))
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }

  unsafe fn dealloc(
    &self,
    ptr: *mut u8,
    _layout: Layout,
  ) {
    unsafe { self.release(ptr) }
  }

  unsafe fn realloc(
    &self,
    ptr: *mut u8,
    layout: Layout,
    new_size: usize,
  ) -> *mut u8 {
    Self::check_layout(&layout)
      .and_then(|()| unsafe { self.resize(ptr, new_size) })
      .map_or(ptr::null_mut(), NonNull::as_ptr)
  }
}

impl<B> fmt::Debug for Allocator<B> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self.heap.try_lock() {
      Some(heap) => write!(f, "Allocator({:?})", &*heap),
      None => write!(f, "Allocator(<locked>)"),
    }
  }
}

#[cfg(test)]
impl Allocator<crate::boundary::Region> {
  fn boundary_used(&self) -> usize {
    self.heap.lock().boundary().used()
  }
}
