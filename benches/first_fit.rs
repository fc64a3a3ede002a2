use criterion::{Criterion, criterion_group, criterion_main};

use brkalloc::{Heap, Region};

fn allocate_release(c: &mut Criterion) {
  let mut heap = Heap::new(Region::with_capacity(1 << 20).unwrap());

  c.bench_function("allocate and release trailing block", |b| {
    b.iter(|| {
      let block = heap.allocate(64).unwrap();
      unsafe { heap.release(block.as_ptr()) };
    });
  });
}

fn scan_free_list(c: &mut Criterion) {
  let mut heap = Heap::new(Region::with_capacity(1 << 20).unwrap());

  // 256 small free blocks in front of every search.
  let blocks: Vec<_> = (0..512).map(|_| heap.allocate(16).unwrap()).collect();
  for block in blocks.iter().step_by(2) {
    unsafe { heap.release(block.as_ptr()) };
  }

  c.bench_function("first fit past 256 small free blocks", |b| {
    b.iter(|| {
      let block = heap.allocate(128).unwrap();
      unsafe { heap.release(block.as_ptr()) };
    });
  });

  c.bench_function("first fit hit on first free block", |b| {
    b.iter(|| {
      let block = heap.allocate(16).unwrap();
      unsafe { heap.release(block.as_ptr()) };
    });
  });
}

criterion_group!(benches, allocate_release, scan_free_list);
criterion_main!(benches);
