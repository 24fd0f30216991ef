//! The placement engine: allocate, free, and resize over the segregated
//! free-list index and the heap arena.
//!
//! One generic implementation, `Allocator<const DOUBLE: bool>`, serves
//! both variants named in the spec. `DOUBLE = false` is the single-link
//! variant (header only, no left-coalescing); `DOUBLE = true` is the
//! double-link variant (header + footer, left-coalescing available on
//! resize-grow). This mirrors the Design Notes' suggestion to make the
//! footer/no-footer choice a compile-time parameter rather than two
//! hand-duplicated implementations.

use std::process;
use std::ptr::{self, null_mut};

use crate::align::{bytes_to_stored_size, stored_size_to_units, UNIT};
use crate::block::{
  footer_ptr, header_from_payload, payload_ptr, read_footer, read_header, total_units,
  write_footer, write_header, Header,
};
use crate::class::class_of;
use crate::freelist::FreeListIndex;
use crate::heap::Heap;

/// Minimum legal total block span, in units, for a variant that does
/// (`DOUBLE = true`) or does not (`DOUBLE = false`) carry a footer. This
/// is the span of a block with exactly one payload unit (stored size 0):
/// header(+footer) plus one payload unit.
const fn min_block_units(has_footer: bool) -> usize {
  if has_footer { 3 } else { 2 }
}

/// Smallest stored size a block may ever be created or resized to. Free
/// blocks thread their class's list through the first *two* payload
/// units (`prev`/`next`); a block with only one payload unit has no room
/// for both, so no block that could ever become free may carry fewer
/// than two. Stored size 0 (one payload unit) remains a legal *header*
/// encoding — `Header::new` and `class_of` still accept it — it is just
/// never produced by this allocator.
const MIN_PAYLOAD_STORED_SIZE: u32 = 1;

/// The segregated-fit allocator. `DOUBLE` selects the block layout:
/// `false` for single-link (header only), `true` for double-link
/// (header + footer, enabling left-coalescing on grow).
pub struct Allocator<const DOUBLE: bool> {
  heap: Heap,
  classes: FreeListIndex,
}

/// Header-only blocks; cannot left-coalesce on resize-grow.
pub type SingleLinkAllocator = Allocator<false>;

/// Header + footer blocks; can left-coalesce on resize-grow.
pub type DoubleLinkAllocator = Allocator<true>;

/// How a forward (or backward) scan for coalescable free neighbours
/// came to a stop.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ScanStop {
  /// Accumulated total already meets or exceeds what was needed.
  Satisfied,
  /// Ran into an allocated block before accumulating enough.
  HitAllocated,
  /// Ran off the edge of the arena (`next`, for forward scans;
  /// `heap_lo`, for backward scans) before accumulating enough.
  HitEdge,
}

/// One absorbed free neighbour, captured before it is mutated: its
/// header address and its class, so it can be detached.
type Neighbour = (*mut u8, usize);

impl<const DOUBLE: bool> Allocator<DOUBLE> {
  /// An empty, lazily-based arena with the default reserved capacity.
  pub const fn new() -> Self {
    Allocator { heap: Heap::new(), classes: FreeListIndex::new() }
  }

  /// Same as [`new`](Self::new) with an explicit arena capacity — see
  /// [`Heap::with_capacity`].
  pub const fn with_capacity(capacity: usize) -> Self {
    Allocator { heap: Heap::with_capacity(capacity), classes: FreeListIndex::new() }
  }

  /// Resets the allocator to an empty arena. Always succeeds — the
  /// arena is lazy, so there is nothing to fail.
  pub fn init(&mut self) -> i32 {
    self.heap = Heap::with_capacity(self.heap_capacity_hint());
    self.classes = FreeListIndex::new();
    0
  }

  fn heap_capacity_hint(&self) -> usize {
    // The only thing worth preserving across an init(): how large a
    // fresh arena should be reserved. heap_size()/heap_lo() both reset
    // to zero regardless.
    crate::heap::DEFAULT_CAPACITY
  }

  pub fn heap_lo(&self) -> usize {
    self.heap.heap_lo()
  }

  pub fn heap_size(&self) -> usize {
    self.heap.heap_size()
  }

  fn min_block(&self) -> u32 {
    min_block_units(DOUBLE) as u32
  }

  /// Smallest total span, in units, a *newly split-off or coalesced*
  /// free block may have — one unit more than [`min_block`](Self::min_block)
  /// so the result always carries at least two payload units. A
  /// remainder narrower than this is kept folded into its neighbour
  /// instead of becoming its own free block.
  fn min_free_span(&self) -> u32 {
    self.min_block() + 1
  }

  fn abort_contract_violation(&self, what: &str) -> ! {
    eprintln!("linkalloc: contract violation: {what}");
    process::abort();
  }

  // ---- malloc -----------------------------------------------------

  /// `bytes == 0` returns null as a designated success value; otherwise
  /// returns an 8-byte-aligned payload pointer of at least `bytes`
  /// bytes, or null if the arena cannot grow to satisfy the request.
  pub fn malloc(&mut self, bytes: usize) -> *mut u8 {
    if bytes == 0 {
      return null_mut();
    }
    let stored_size = bytes_to_stored_size(bytes).max(MIN_PAYLOAD_STORED_SIZE);
    self.allocate(stored_size)
  }

  fn allocate(&mut self, stored_size: u32) -> *mut u8 {
    let class = class_of(stored_size);

    if !self.classes.is_empty(class) {
      if crate::class::is_small_class(class) {
        let block = self.classes.head(class);
        unsafe { self.classes.remove(class, block) };
        self.mark_allocated(block, stored_size);
        return unsafe { payload_ptr(block) };
      }
      let hit = unsafe { self.classes.first_fit(class, stored_size) };
      if !hit.is_null() {
        unsafe { self.classes.remove(class, hit) };
        return self.split_and_allocate(hit, stored_size);
      }
    }

    self.escalate_or_grow(class, stored_size)
  }

  /// Writes an exact-fit header for a small-class block pulled straight
  /// off its list head (no split needed; classes 0-6 map 1:1 to stored
  /// size, so the head is always an exact fit).
  fn mark_allocated(&self, block: *mut u8, stored_size: u32) {
    let header = Header::new(stored_size, true, class_of(stored_size) as u32);
    unsafe {
      write_header(block, header);
      if DOUBLE {
        write_footer(footer_ptr(block, stored_size_to_units(stored_size)), header);
      }
    }
  }

  fn escalate_or_grow(&mut self, class: usize, stored_size: u32) -> *mut u8 {
    if let Some(j) = self.classes.lowest_nonempty_above(class) {
      let block = self.classes.head(j);
      unsafe { self.classes.remove(j, block) };
      self.split_and_allocate(block, stored_size)
    } else {
      self.carve_fresh(stored_size)
    }
  }

  /// Carves a brand-new block from the arena frontier, growing the
  /// heap if necessary.
  fn carve_fresh(&mut self, stored_size: u32) -> *mut u8 {
    let payload_units = stored_size_to_units(stored_size);
    let span = total_units(payload_units, DOUBLE);
    let start = self.heap.next();
    if !self.heap.grow_heap(span) {
      return null_mut();
    }
    let block = start as *mut u8;
    self.mark_allocated(block, stored_size);
    unsafe { payload_ptr(block) }
  }

  /// Splits a free block `L` of stored size `p` to serve a request of
  /// stored size `q` (`q <= p`), keeping the whole block allocated
  /// ("internal slack") when the tail would be smaller than the
  /// smallest legal block.
  fn split_in_place(&mut self, block: *mut u8, p: u32, q: u32) {
    debug_assert!(q <= p);
    let remaining = p - q;

    if remaining < self.min_free_span() {
      self.mark_allocated(block, p);
      return;
    }

    self.mark_allocated(block, q);
    let left_span = total_units(stored_size_to_units(q), DOUBLE);
    let right_block = unsafe { block.add(left_span * UNIT) };
    let right_stored_size = remaining - self.min_block();
    self.free_block_raw(right_block, right_stored_size);
  }

  fn split_and_allocate(&mut self, block: *mut u8, q: u32) -> *mut u8 {
    let p = unsafe { read_header(block) }.size();
    self.split_in_place(block, p, q);
    unsafe { payload_ptr(block) }
  }

  /// Marks a block free, refreshes its footer, and appends it to its
  /// class's free list.
  fn free_block_raw(&mut self, block: *mut u8, stored_size: u32) {
    debug_assert!(stored_size >= MIN_PAYLOAD_STORED_SIZE, "free block narrower than two payload units");
    let class = class_of(stored_size);
    let header = Header::new(stored_size, false, class as u32);
    unsafe {
      write_header(block, header);
      if DOUBLE {
        write_footer(footer_ptr(block, stored_size_to_units(stored_size)), header);
      }
      self.classes.push_back(class, block);
    }
  }

  // ---- free ---------------------------------------------------------

  /// Null is a no-op. A non-null pointer must name the payload of a
  /// currently-allocated block; any other pointer is a contract
  /// violation and aborts the process.
  pub fn free(&mut self, payload: *mut u8) {
    if payload.is_null() {
      return;
    }
    let block = unsafe { header_from_payload(payload) };
    let header = unsafe { read_header(block) };
    if !header.alloc() {
      self.abort_contract_violation("free() of a pointer that is not currently allocated");
    }
    if DOUBLE {
      let footer = unsafe { footer_ptr(block, header.payload_units()) };
      if unsafe { read_footer(footer) } != header {
        self.abort_contract_violation("free() footer does not match header");
      }
    }
    self.free_block_raw(block, header.size());
  }

  // ---- realloc --------------------------------------------------------

  /// Null pointer is equivalent to `malloc`. `bytes == 0` frees the
  /// block and returns null. Otherwise resizes in place when possible
  /// (shrink-split, right-coalesce, left-coalesce for the double
  /// variant, heap growth) and falls back to allocate-copy-free.
  pub fn realloc(&mut self, payload: *mut u8, bytes: usize) -> *mut u8 {
    if payload.is_null() {
      return self.malloc(bytes);
    }
    if bytes == 0 {
      self.free(payload);
      return null_mut();
    }

    let block = unsafe { header_from_payload(payload) };
    let header = unsafe { read_header(block) };
    if !header.alloc() {
      self.abort_contract_violation("realloc() of a pointer that is not currently allocated");
    }
    if DOUBLE {
      let footer = unsafe { footer_ptr(block, header.payload_units()) };
      if unsafe { read_footer(footer) } != header {
        self.abort_contract_violation("realloc() footer does not match header");
      }
    }

    let p = header.size();
    let q = bytes_to_stored_size(bytes).max(MIN_PAYLOAD_STORED_SIZE);

    if q == p {
      return payload;
    }
    if q < p {
      self.split_in_place(block, p, q);
      return unsafe { payload_ptr(block) };
    }
    self.resize_grow(block, p, q)
  }

  /// Scans forward from the unit immediately after a block of stored
  /// size `from_size`, accumulating consecutive free neighbours' total
  /// spans until `needed` is met, an allocated block is hit, or the
  /// arena frontier is reached.
  fn scan_forward(&self, block: *mut u8, from_size: u32, needed: u32) -> (u32, Vec<Neighbour>, ScanStop) {
    let mut cursor = unsafe { block.add(total_units(stored_size_to_units(from_size), DOUBLE) * UNIT) };
    let mut total = 0u32;
    let mut neighbours = Vec::new();

    loop {
      if total >= needed {
        return (total, neighbours, ScanStop::Satisfied);
      }
      if (cursor as usize) >= self.heap.next() {
        return (total, neighbours, ScanStop::HitEdge);
      }
      let header = unsafe { read_header(cursor) };
      if header.alloc() {
        return (total, neighbours, ScanStop::HitAllocated);
      }
      let span = total_units(header.payload_units(), DOUBLE) as u32;
      neighbours.push((cursor, class_of(header.size())));
      total += span;
      cursor = unsafe { cursor.add(span as usize * UNIT) };
    }
  }

  /// Scans backward from a block's header address, accumulating
  /// consecutive free left neighbours (identified via their footers)
  /// until `right_total + left_total >= needed`, an allocated left
  /// neighbour is hit, or the heap base is reached. Only meaningful for
  /// the double-link variant, whose blocks carry footers.
  fn scan_backward(&self, block: *mut u8, right_total: u32, needed: u32) -> (u32, Vec<Neighbour>, ScanStop) {
    let mut cursor = block;
    let mut total = 0u32;
    let mut neighbours = Vec::new();

    loop {
      if right_total + total >= needed {
        return (total, neighbours, ScanStop::Satisfied);
      }
      if (cursor as usize) <= self.heap.heap_lo() {
        return (total, neighbours, ScanStop::HitEdge);
      }
      let footer_addr = unsafe { cursor.sub(UNIT) };
      let footer = unsafe { read_footer(footer_addr) };
      if footer.alloc() {
        return (total, neighbours, ScanStop::HitAllocated);
      }
      let span = total_units(footer.payload_units(), true) as u32;
      let header_addr = unsafe { cursor.sub(span as usize * UNIT) };
      neighbours.push((header_addr, class_of(footer.size())));
      total += span;
      cursor = header_addr;
    }
  }

  fn resize_grow(&mut self, block: *mut u8, p: u32, q: u32) -> *mut u8 {
    let needed = q - p;
    let (right_total, right_neighbours, right_stop) = self.scan_forward(block, p, needed);

    if right_stop == ScanStop::Satisfied {
      let end_addr = unsafe { block.add((total_units(stored_size_to_units(p), DOUBLE) + right_total as usize) * UNIT) };
      self.detach_all(&right_neighbours);
      return self.finish_growth(block, block, p, q, needed, right_total, end_addr);
    }

    if DOUBLE {
      let (left_total, left_neighbours, left_stop) = self.scan_backward(block, right_total, needed);
      if left_stop == ScanStop::Satisfied {
        let new_block = left_neighbours.last().map(|&(ptr, _)| ptr).unwrap_or(block);
        let end_addr =
          unsafe { block.add((total_units(stored_size_to_units(p), DOUBLE) + right_total as usize) * UNIT) };
        self.detach_all(&right_neighbours);
        self.detach_all(&left_neighbours);
        return self.finish_growth(block, new_block, p, q, needed, right_total + left_total, end_addr);
      }
    }

    if right_stop == ScanStop::HitEdge {
      let shortfall = needed - right_total;
      if self.heap.grow_heap(shortfall) {
        self.detach_all(&right_neighbours);
        self.mark_allocated(block, q);
        return unsafe { payload_ptr(block) };
      }
    }

    self.relocate(block, p, q)
  }

  fn detach_all(&mut self, neighbours: &[Neighbour]) {
    for &(ptr, class) in neighbours {
      unsafe { self.classes.remove(class, ptr) };
    }
  }

  /// Common tail end of both the right-only and left+right coalescing
  /// paths: decides whether the leftover space (if any) becomes a
  /// reconstituted free block or is entirely absorbed, writes the new
  /// (possibly relocated) header/footer, relocates the payload bytes if
  /// the block moved, and returns the new payload pointer.
  ///
  /// A leftover narrower than [`min_free_span`](Self::min_free_span) is
  /// always absorbed rather than reconstituted as its own free block —
  /// same floor `split_in_place` applies, so every block this allocator
  /// ever frees has room for its own list links.
  ///
  /// `old_block`/`new_block` coincide for a right-only coalesce;
  /// `new_block < old_block` once a left neighbour was absorbed.
  fn finish_growth(
    &mut self,
    old_block: *mut u8,
    new_block: *mut u8,
    p: u32,
    q: u32,
    needed: u32,
    total: u32,
    end_addr: *mut u8,
  ) -> *mut u8 {
    let extra = total - needed;
    let final_stored_size;

    if extra < self.min_free_span() {
      final_stored_size = q + extra;
    } else {
      let tail = unsafe { end_addr.sub(extra as usize * UNIT) };
      self.free_block_raw(tail, extra - self.min_block());
      final_stored_size = q;
    }

    self.mark_allocated(new_block, final_stored_size);

    if new_block != old_block {
      let old_payload = unsafe { payload_ptr(old_block) };
      let new_payload = unsafe { payload_ptr(new_block) };
      let copy_bytes = (p as usize + 1) * UNIT;
      unsafe { ptr::copy(old_payload, new_payload, copy_bytes) };
      return new_payload;
    }

    unsafe { payload_ptr(new_block) }
  }

  /// Allocate-copy-free fallback: the block cannot grow in place.
  fn relocate(&mut self, block: *mut u8, p: u32, q: u32) -> *mut u8 {
    let new_payload = self.allocate(q);
    if new_payload.is_null() {
      return null_mut();
    }
    let old_payload = unsafe { payload_ptr(block) };
    let copy_bytes = (p as usize + 1) * UNIT;
    unsafe { ptr::copy(old_payload, new_payload, copy_bytes) };
    self.free_block_raw(block, p);
    new_payload
  }

  // ---- diagnostics ----------------------------------------------------

  /// Walks the heap from `heap_lo` by header-driven step, printing each
  /// block's size/alloc/class state to stderr. A debugging aid only —
  /// not part of the observable contract.
  pub fn dump(&self) {
    let mut addr = self.heap.heap_lo();
    let end = self.heap.next();
    eprintln!("linkalloc: heap [{addr:#x}, {end:#x})");
    while addr < end {
      let block = addr as *mut u8;
      let header = unsafe { read_header(block) };
      eprintln!(
        "  block {:#x}: stored_size={} alloc={} class={}",
        addr,
        header.size(),
        header.alloc(),
        header.class_index()
      );
      addr += total_units(header.payload_units(), DOUBLE) * UNIT;
    }
  }

  /// Walks `[heap_lo, next)` and checks that it is covered by a
  /// well-formed sequence of blocks with no gap or overlap — the "heap
  /// cover" invariant.
  pub fn check_heap_cover(&self) -> bool {
    let mut addr = self.heap.heap_lo();
    let end = self.heap.next();
    while addr < end {
      let block = addr as *mut u8;
      let header = unsafe { read_header(block) };
      if DOUBLE {
        let footer = unsafe { footer_ptr(block, header.payload_units()) };
        if unsafe { read_footer(footer) } != header {
          return false;
        }
      }
      addr += total_units(header.payload_units(), DOUBLE) * UNIT;
    }
    addr == end
  }

  /// For every class, every listed block is free and correctly
  /// classified — the "list membership" invariant.
  pub fn check_list_membership(&self) -> bool {
    for class in 0..crate::class::NUM_CLASSES {
      for block in unsafe { self.classes.iter(class) } {
        let header = unsafe { read_header(block) };
        if header.alloc() || class_of(header.size()) != class {
          return false;
        }
      }
    }
    true
  }

  /// Delegates to the free-list index's own chain-integrity check.
  pub fn check_chain_integrity(&self) -> bool {
    unsafe { self.classes.check_chain_integrity() }
  }

  /// All three structural invariants at once.
  pub fn check_invariants(&self) -> bool {
    self.check_heap_cover() && self.check_list_membership() && self.check_chain_integrity()
  }
}

impl<const DOUBLE: bool> Default for Allocator<DOUBLE> {
  fn default() -> Self {
    Self::new()
  }
}
