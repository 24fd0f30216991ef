//! Interactive walkthrough of the allocate/resize/free scenarios from the
//! spec's testable-properties section, adapted from the teacher crate's
//! `examples/bump.rs` demo.
//!
//! Press ENTER between steps to inspect the arena state (`dump()`) as it
//! changes.

use std::io::Read;

use linkalloc::{DoubleLinkAllocator, SingleLinkAllocator};

fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn write_pattern(ptr: *mut u8, len: usize, seed: u8) {
  for i in 0..len {
    unsafe { ptr.add(i).write(seed.wrapping_add(i as u8)) };
  }
}

fn main() {
  println!("=== single-link variant ===");
  let mut single = SingleLinkAllocator::new();

  println!("\n[1] malloc(8) -> p1");
  let p1 = single.malloc(8);
  write_pattern(p1, 8, 0x11);
  single.dump();
  block_until_enter_pressed();

  println!("\n[2] realloc(p1, 1024) -> p2 (grows, likely carves fresh)");
  let p2 = single.realloc(p1, 1024);
  write_pattern(p2, 1024, 0x22);
  single.dump();
  block_until_enter_pressed();

  println!("\n[3] realloc(p2, 8) -> p3 (shrinks, frees the tail)");
  let p3 = single.realloc(p2, 8);
  single.dump();
  block_until_enter_pressed();

  println!("\n[4] realloc(p3, 256) -> p4, then realloc(p4, 2048) -> p5");
  let p4 = single.realloc(p3, 256);
  let p5 = single.realloc(p4, 2048);
  single.dump();
  block_until_enter_pressed();

  println!("\n[5] malloc(256) -> q1, free(p5), realloc(q1, 512) -> q2 (single variant relocates)");
  let q1 = single.malloc(256);
  single.free(p5);
  let q2 = single.realloc(q1, 512);
  single.dump();
  assert!(single.check_invariants());
  single.free(q2);

  println!("\n=== double-link variant: same shape, but left-coalesces where it can ===");
  let mut double = DoubleLinkAllocator::new();
  let p1 = double.malloc(8);
  let p2 = double.realloc(p1, 1024);
  let p3 = double.realloc(p2, 8);
  let q1 = double.malloc(256);
  double.free(p3);
  println!("\n[6] realloc(q1, 512) -> q2 (left-coalesces into the block just freed, if adjacent)");
  let q2 = double.realloc(q1, 512);
  double.dump();
  assert!(double.check_invariants());
  double.free(q2);

  println!("\n[7] grow-past-INT_MAX: a single malloc requiring chunked heap extension");
  let mut chunked = SingleLinkAllocator::with_capacity(1usize << 33);
  let big = chunked.malloc((i32::MAX as usize) + (1usize << 20));
  println!("chunked allocation {}", if big.is_null() { "failed" } else { "succeeded" });
  assert!(chunked.check_invariants());

  println!("\ndone.");
}
