use std::{env, io::Read, ptr::NonNull};

use brkalloc::{Allocator, Sbrk, SystemHeap, program_break};

/// Waits until the user presses ENTER when run with `--pause`.
/// Useful to inspect the process with `pmap` or `gdb` between steps.
fn block_until_enter_pressed(pause: bool) {
  if !pause {
    return;
  }
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

/// Prints the current program break.
fn print_program_break(label: &str) {
  let brk = program_break();
  println!("[{}] PID = {}, program break = {:?}", label, std::process::id(), brk);
}

fn print_alloc(
  allocator: &Allocator<Sbrk>,
  size: usize,
  addr: NonNull<u8>,
) {
  println!(
    "Allocated {} bytes ({} usable), address = {:?}, program break = {:?}",
    size,
    unsafe { allocator.usable_size(addr) },
    addr,
    program_break()
  );
}

fn main() {
  let pause = env::args().any(|arg| arg == "--pause");

  // Not installed as the global allocator: this program's own Vec/String
  // traffic goes to the platform malloc, which may also move the break.
  let allocator = SystemHeap;

  print_program_break("start");
  block_until_enter_pressed(pause);

  // 1) A u32 grows the break by one header plus 16 bytes.
  let first = allocator.allocate(4).expect("allocate u32");
  println!("\n[1] Allocate u32");
  print_alloc(&allocator, 4, first);
  unsafe { (first.as_ptr() as *mut u32).write(0xDEADBEEF) };
  block_until_enter_pressed(pause);

  // 2) A 12 byte array gets rounded up to 16.
  let second = allocator.allocate(12).expect("allocate [u8; 12]");
  println!("\n[2] Allocate [u8; 12]");
  print_alloc(&allocator, 12, second);
  unsafe { second.as_ptr().write_bytes(0xAB, 12) };
  block_until_enter_pressed(pause);

  // 3) Releasing a block that is not the last one only marks it free.
  unsafe { allocator.release(first.as_ptr()) };
  println!("\n[3] Released first block: {}", allocator.stats());
  print_program_break("after release");
  block_until_enter_pressed(pause);

  // 4) A small request is served by the free block instead of the break.
  let third = allocator.allocate(2).expect("allocate [u8; 2]");
  println!("\n[4] Allocate [u8; 2] (check reuse of freed block)");
  print_alloc(&allocator, 2, third);
  println!(
    "[4] third == first? {}",
    if third == first { "Yes, it reused the freed block" } else { "No, it grew the heap" }
  );
  block_until_enter_pressed(pause);

  // 5) A zeroed 64 KiB block, then growing it in place is impossible.
  let big = allocator.zero_allocate(16, 4096).expect("zero_allocate 64 KiB");
  println!("\n[5] Zero-allocate 64 KiB");
  print_alloc(&allocator, 64 * 1024, big);
  let bigger = unsafe { allocator.resize(big.as_ptr(), 128 * 1024) }.expect("resize to 128 KiB");
  println!("[5] Resized to 128 KiB, moved = {}", bigger != big);
  block_until_enter_pressed(pause);

  // 6) Releasing the trailing block gives the memory back to the OS.
  print_program_break("before trailing release");
  unsafe { allocator.release(bigger.as_ptr()) };
  print_program_break("after trailing release");

  println!("\n[6] {}", allocator.stats());
  match allocator.check() {
    Ok(blocks) => println!("[6] Block list consistent, {blocks} blocks"),
    Err(err) => println!("[6] {err}"),
  }
}
