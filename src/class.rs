//! Segregated size classes.
//!
//! Eleven buckets. Classes 0-6 are "small" (exact stored size, 0-6) and
//! are served head-first with no search; 7-9 are "medium" and 10 is
//! "large" — both get a first-fit linear scan. The boundaries come
//! straight from the size-class table: 7-14, 15-30, 31-62, 63+ double at
//! each medium/large step, which keeps internal fragmentation bounded
//! without needing a size-search for the common small cases.

/// Number of segregated free-list buckets.
pub const NUM_CLASSES: usize = 11;

/// Highest class index that is searched head-first with no size check.
pub const LAST_SMALL_CLASS: usize = 6;

/// Returns the class index `0..NUM_CLASSES` that a free or allocated
/// block of the given stored size belongs to.
pub fn class_of(stored_size: u32) -> usize {
  match stored_size {
    0..=6 => stored_size as usize,
    7..=14 => 7,
    15..=30 => 8,
    31..=62 => 9,
    _ => 10,
  }
}

/// `true` for classes 0..=6, which are served by taking the list head
/// unconditionally rather than scanning for a fitting block.
pub fn is_small_class(class: usize) -> bool {
  class <= LAST_SMALL_CLASS
}
