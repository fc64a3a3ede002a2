//! A logger that allocates through the allocator it is logging for.

use std::sync::{
  LazyLock,
  atomic::{AtomicUsize, Ordering},
};

use brkalloc::{Allocator, Region};
use log::{LevelFilter, Log, Metadata, Record};

static HEAP: LazyLock<Allocator<Region>> =
  LazyLock::new(|| Allocator::new(Region::with_capacity(64 * 1024).unwrap()));

static RECORDS: AtomicUsize = AtomicUsize::new(0);

struct AllocatingLogger;

impl Log for AllocatingLogger {
  fn enabled(
    &self,
    _metadata: &Metadata,
  ) -> bool {
    true
  }

  fn log(
    &self,
    _record: &Record,
  ) {
    RECORDS.fetch_add(1, Ordering::SeqCst);

    let scratch = HEAP.allocate(32).unwrap();
    unsafe { HEAP.release(scratch.as_ptr()) };
  }

  fn flush(&self) {}
}

static LOGGER: AllocatingLogger = AllocatingLogger;

#[test]
fn test_allocating_logger_does_not_recurse() {
  log::set_logger(&LOGGER).unwrap();
  log::set_max_level(LevelFilter::Trace);

  let block = HEAP.allocate(16).unwrap();
  assert_eq!(1, RECORDS.load(Ordering::SeqCst));

  unsafe { HEAP.release(block.as_ptr()) };
  assert_eq!(2, RECORDS.load(Ordering::SeqCst));

  assert_eq!(Ok(0), HEAP.check());
  assert_eq!(0, HEAP.stats().blocks);
}
