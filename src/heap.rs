//! Heap arena interface: the host collaborator the allocator grows into.
//!
//! The spec treats `sbrk`/`heap_lo`/`heap_size`/`reset` as a contract
//! presented by an external host memory library, out of scope for this
//! crate's own subject matter. Rather than move the *real* process break
//! the way the teacher crate's `bump` module does (which is process-wide
//! state — two `Heap`s in the same process, as happen constantly under
//! `cargo test`, would stomp on each other), this crate gives that host
//! contract a self-contained body: each `Heap` reserves its own
//! anonymous `mmap` region up front and simulates `sbrk` by advancing a
//! logical frontier within it. Same `libc` dependency the teacher uses,
//! same sbrk-shaped contract, just privately backed instead of sharing
//! the one process break.

use std::ffi::c_void;
use std::ptr;

use libc::{MAP_ANONYMOUS, MAP_PRIVATE, PROT_READ, PROT_WRITE, mmap, munmap};

use crate::align::UNIT;

/// Default reserved capacity for a lazily-based heap: generous enough
/// for realistic workloads, modest enough not to waste address space
/// across many short-lived allocators in a test binary.
pub const DEFAULT_CAPACITY: usize = 64 * 1024 * 1024;

/// The host's documented single-`sbrk`-call ceiling (§4.2: "if the
/// amount exceeds the host's per-call maximum (INT_MAX bytes)").
pub const MAX_SBRK_CHUNK: usize = i32::MAX as usize;

/// Owns the monotonically growing arena `[heap_lo, next)`, backed by a
/// private anonymous mapping of `capacity` bytes.
pub struct Heap {
  base: *mut u8,
  capacity: usize,
  /// Logical frontier offset from `base`. `next() == base + next_offset`.
  next_offset: usize,
}

impl Heap {
  /// An empty, not-yet-based arena with the default reserved capacity.
  /// The mapping is made on the first `grow_heap` call.
  pub const fn new() -> Self {
    Self::with_capacity(DEFAULT_CAPACITY)
  }

  /// Same as [`new`](Self::new), but with an explicit reserved capacity
  /// — the moral equivalent of `mem_init(maxsize)` in the host memory
  /// library this module stands in for. Useful for deterministically
  /// exercising heap exhaustion without growing a real multi-gigabyte
  /// arena.
  pub const fn with_capacity(capacity: usize) -> Self {
    Heap { base: ptr::null_mut(), capacity, next_offset: 0 }
  }

  fn ensure_mapped(&mut self) {
    if !self.base.is_null() {
      return;
    }
    let region = unsafe {
      mmap(
        ptr::null_mut(),
        self.capacity,
        PROT_READ | PROT_WRITE,
        MAP_PRIVATE | MAP_ANONYMOUS,
        -1,
        0,
      )
    };
    assert!(region != libc::MAP_FAILED, "failed to reserve heap arena via mmap");
    self.base = region as *mut u8;
  }

  /// Base address of the arena. `0` until the first growth request.
  pub fn heap_lo(&self) -> usize {
    self.base as usize
  }

  /// Current byte size of the arena (`next - heap_lo`).
  pub fn heap_size(&self) -> usize {
    self.next_offset
  }

  /// First not-yet-assigned byte address (the arena frontier).
  pub fn next(&self) -> usize {
    self.heap_lo() + self.next_offset
  }

  /// Requests `units * UNIT` more bytes from the host, splitting the
  /// request into `MAX_SBRK_CHUNK`-sized sub-calls. Returns `false`
  /// (with the arena restored to its pre-call size) if the arena's
  /// reserved capacity would be exceeded.
  pub fn grow_heap(&mut self, units: usize) -> bool {
    self.grow_heap_capped(units, MAX_SBRK_CHUNK)
  }

  /// [`grow_heap`](Self::grow_heap) with an overridable per-call chunk
  /// ceiling, so the chunking and mid-chunk-failure-reset logic can be
  /// exercised at a tractable scale in tests.
  pub(crate) fn grow_heap_capped(&mut self, units: usize, chunk_cap: usize) -> bool {
    self.ensure_mapped();
    let entry_size = self.heap_size();
    let mut remaining = units * UNIT;

    while remaining > 0 {
      let chunk = remaining.min(chunk_cap);
      if !self.sbrk_chunk(chunk) {
        self.reset_to(entry_size);
        return false;
      }
      remaining -= chunk;
    }
    true
  }

  /// Simulated single `sbrk(chunk_bytes)` call: succeeds iff the
  /// reserved capacity is not exceeded.
  fn sbrk_chunk(&mut self, chunk_bytes: usize) -> bool {
    if self.next_offset + chunk_bytes > self.capacity {
      return false;
    }
    self.next_offset += chunk_bytes;
    true
  }

  /// Restores the arena to the byte size it had at some earlier point
  /// (§4.2's "reset the arena to the size it had at entry").
  fn reset_to(&mut self, size: usize) {
    self.next_offset = size;
  }

  /// Raw pointer to an absolute arena address, for header/footer access.
  ///
  /// # Safety
  ///
  /// `addr` must lie within `[heap_lo(), next())`.
  pub unsafe fn ptr_at(&self, addr: usize) -> *mut u8 {
    debug_assert!(addr >= self.heap_lo() && addr <= self.next());
    addr as *mut u8
  }
}

impl Default for Heap {
  fn default() -> Self {
    Self::new()
  }
}

impl Drop for Heap {
  fn drop(&mut self) {
    if !self.base.is_null() {
      unsafe { munmap(self.base as *mut c_void, self.capacity) };
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_heap_has_zero_size() {
    let heap = Heap::new();
    assert_eq!(heap.heap_lo(), 0);
    assert_eq!(heap.heap_size(), 0);
  }

  #[test]
  fn growth_advances_next_by_requested_units() {
    let mut heap = Heap::new();
    assert!(heap.grow_heap(16));
    assert_eq!(heap.heap_size(), 16 * UNIT);
    let next_after_first = heap.next();

    assert!(heap.grow_heap(4));
    assert_eq!(heap.next(), next_after_first + 4 * UNIT);
    assert_eq!(heap.heap_size(), 20 * UNIT);
  }

  #[test]
  fn growth_past_capacity_fails_and_restores_size() {
    let mut heap = Heap::with_capacity(64);
    assert!(heap.grow_heap(4)); // 32 bytes, fits
    let size_before = heap.heap_size();

    assert!(!heap.grow_heap(8)); // would need 64 more bytes, exceeds capacity
    assert_eq!(heap.heap_size(), size_before, "failed growth must restore prior size");
  }

  #[test]
  fn chunked_growth_succeeds_when_capacity_allows_it() {
    // Exercises the "split into multiple calls" path with a tiny chunk
    // ceiling standing in for the host's per-call maximum.
    let mut heap = Heap::with_capacity(1024);
    assert!(heap.grow_heap_capped(100, 16)); // 800 bytes, many 16-byte chunks
    assert_eq!(heap.heap_size(), 800);
  }

  #[test]
  fn mid_chunk_failure_restores_entry_size_exactly() {
    let mut heap = Heap::with_capacity(100);
    assert!(heap.grow_heap_capped(5, 16)); // 40 bytes, succeeds
    let entry_size = heap.heap_size();

    // Requesting 80 more bytes in 16-byte chunks: 40+80=120 > 100, so a
    // later sub-chunk must fail and the whole request must roll back.
    assert!(!heap.grow_heap_capped(10, 16));
    assert_eq!(heap.heap_size(), entry_size);
  }
}
