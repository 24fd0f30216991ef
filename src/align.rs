//! Byte/unit conversion helpers.
//!
//! The allocator accounts for memory in 8-byte *units* rather than raw
//! bytes; a byte request rounds up to the unit granularity and is
//! expressed as a stored size (payload units - 1).

/// Size, in bytes, of one allocation unit.
pub const UNIT: usize = 8;

/// Converts a byte request (`bytes >= 1`) to a stored size.
///
/// Stored size is *payload_units - 1*: `bytes_to_stored_size(1)` through
/// `bytes_to_stored_size(8)` all yield `0` (one payload unit).
///
/// # Panics
///
/// Debug-asserts `bytes >= 1`; callers special-case `bytes == 0`
/// themselves (it is a distinct, successful no-op).
pub fn bytes_to_stored_size(bytes: usize) -> u32 {
  debug_assert!(bytes >= 1, "bytes_to_stored_size called with 0");
  let payload_units = (bytes + UNIT - 1) / UNIT;
  (payload_units - 1) as u32
}

/// Converts a stored size back to a payload unit count.
pub fn stored_size_to_units(stored_size: u32) -> usize {
  stored_size as usize + 1
}

/// Converts a payload unit count to the byte count it can hold.
pub fn units_to_bytes(units: usize) -> usize {
  units * UNIT
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn one_through_eight_bytes_need_one_unit() {
    for b in 1..=8 {
      assert_eq!(bytes_to_stored_size(b), 0, "bytes={b}");
    }
  }

  #[test]
  fn nine_through_sixteen_bytes_need_two_units() {
    for b in 9..=16 {
      assert_eq!(bytes_to_stored_size(b), 1, "bytes={b}");
    }
  }

  #[test]
  fn stored_size_round_trips_through_units() {
    for s in 0u32..100 {
      let units = stored_size_to_units(s);
      assert_eq!(units, s as usize + 1);
      assert_eq!(units_to_bytes(units), units * 8);
    }
  }
}
