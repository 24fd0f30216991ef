//! Block metadata: the bit-packed header/footer value type.
//!
//! A block's header occupies exactly one unit (8 bytes, 64 bits):
//!
//! ```text
//!   bit:   63                 32 31   30 29              0
//!          ┌────────────────────┬──┬────┬─────────────────┐
//!          │    class_index     │A │ RR │       size      │
//!          └────────────────────┴──┴────┴─────────────────┘
//!           32 bits              1  2           29 bits
//! ```
//!
//! `size` is the *stored size*: payload units minus one. `A` is the
//! allocated flag. `RR` is reserved padding, always zero. The
//! double-link variant writes a byte-identical copy of this word as a
//! footer at the far end of the block, which is why `Header` and
//! `Footer` are the same type — the footer-parity check the double
//! variant relies on is a single `u64` comparison because both share
//! exactly the same bit layout.
//!
//! Modeled as a compact value type with accessors rather than raw Rust
//! bitfields (the language has none) to keep the bit layout explicit and
//! portable instead of implementation-defined.

use crate::align::UNIT;

const SIZE_BITS: u32 = 29;
const SIZE_MASK: u64 = (1 << SIZE_BITS) - 1;
const ALLOC_BIT: u64 = 1 << 31;
const CLASS_SHIFT: u32 = 32;

/// A packed block header (or, for the double-link variant, footer).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Header(u64);

impl Header {
  /// Builds a header for a block of the given stored size, allocation
  /// state, and free-list class.
  pub fn new(stored_size: u32, alloc: bool, class_index: u32) -> Self {
    debug_assert!(stored_size <= SIZE_MASK as u32, "stored size overflows 29 bits");
    let mut word = (stored_size as u64) & SIZE_MASK;
    if alloc {
      word |= ALLOC_BIT;
    }
    word |= (class_index as u64) << CLASS_SHIFT;
    Header(word)
  }

  /// Stored size: payload units minus one.
  pub fn size(self) -> u32 {
    (self.0 & SIZE_MASK) as u32
  }

  /// Number of payload units this block carries.
  pub fn payload_units(self) -> usize {
    self.size() as usize + 1
  }

  pub fn alloc(self) -> bool {
    self.0 & ALLOC_BIT != 0
  }

  pub fn class_index(self) -> u32 {
    (self.0 >> CLASS_SHIFT) as u32
  }

  pub fn set_size(&mut self, stored_size: u32) {
    debug_assert!(stored_size <= SIZE_MASK as u32, "stored size overflows 29 bits");
    self.0 = (self.0 & !SIZE_MASK) | (stored_size as u64 & SIZE_MASK);
  }

  pub fn set_alloc(&mut self, alloc: bool) {
    if alloc {
      self.0 |= ALLOC_BIT;
    } else {
      self.0 &= !ALLOC_BIT;
    }
  }

  pub fn set_class_index(&mut self, class_index: u32) {
    self.0 = (self.0 & ((1 << CLASS_SHIFT) - 1)) | ((class_index as u64) << CLASS_SHIFT);
  }

  fn to_raw(self) -> u64 {
    self.0
  }

  fn from_raw(word: u64) -> Self {
    Header(word)
  }
}

/// The double-link variant's footer shares the header's exact bit layout.
pub type Footer = Header;

/// Total span, in units, of a block with the given payload size and
/// whether it carries a footer.
pub fn total_units(payload_units: usize, has_footer: bool) -> usize {
  1 + payload_units + has_footer as usize
}

/// Reads the header word at a block's header unit.
///
/// # Safety
///
/// `block` must point to a live header unit within the arena.
pub unsafe fn read_header(block: *mut u8) -> Header {
  unsafe { Header::from_raw((block as *const u64).read_unaligned()) }
}

/// Writes the header word at a block's header unit.
///
/// # Safety
///
/// `block` must point to a live, writable header unit within the arena.
pub unsafe fn write_header(block: *mut u8, header: Header) {
  unsafe { (block as *mut u64).write_unaligned(header.to_raw()) };
}

/// Address of the payload given the block's header address.
///
/// # Safety
///
/// `block` must point to a live header unit.
pub unsafe fn payload_ptr(block: *mut u8) -> *mut u8 {
  unsafe { block.add(UNIT) }
}

/// Recovers the header address given a payload pointer, by walking back
/// one unit ("derive the header from the payload pointer, one unit
/// backwards").
///
/// # Safety
///
/// `payload` must have been produced by [`payload_ptr`] on a live block.
pub unsafe fn header_from_payload(payload: *mut u8) -> *mut u8 {
  unsafe { payload.sub(UNIT) }
}

/// Address of a block's footer, given its header address and payload
/// unit count. Only meaningful for the double-link variant.
///
/// # Safety
///
/// `block` must point to a live header unit whose payload spans
/// `payload_units` units and which does carry a footer.
pub unsafe fn footer_ptr(block: *mut u8, payload_units: usize) -> *mut u8 {
  unsafe { block.add(UNIT * (1 + payload_units)) }
}

/// Reads the footer word.
///
/// # Safety
///
/// See [`read_header`]; the same requirement applies to the footer unit.
pub unsafe fn read_footer(footer: *mut u8) -> Footer {
  unsafe { read_header(footer) }
}

/// Writes the footer word.
///
/// # Safety
///
/// See [`write_header`]; the same requirement applies to the footer unit.
pub unsafe fn write_footer(footer: *mut u8, value: Footer) {
  unsafe { write_header(footer, value) };
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_through_bit_packing() {
    let h = Header::new(41, true, 9);
    assert_eq!(h.size(), 41);
    assert_eq!(h.payload_units(), 42);
    assert!(h.alloc());
    assert_eq!(h.class_index(), 9);
  }

  #[test]
  fn setters_are_independent() {
    let mut h = Header::new(0, false, 0);
    h.set_size(500_000);
    h.set_alloc(true);
    h.set_class_index(10);
    assert_eq!(h.size(), 500_000);
    assert!(h.alloc());
    assert_eq!(h.class_index(), 10);

    h.set_alloc(false);
    assert!(!h.alloc());
    assert_eq!(h.size(), 500_000, "clearing alloc must not disturb size");
    assert_eq!(h.class_index(), 10, "clearing alloc must not disturb class");
  }

  #[test]
  fn header_and_footer_share_bit_layout() {
    let h = Header::new(7, true, 7);
    let f: Footer = h;
    assert_eq!(h, f);
  }

  #[test]
  fn total_units_accounts_for_footer() {
    assert_eq!(total_units(1, false), 2);
    assert_eq!(total_units(1, true), 3);
  }

  #[test]
  fn read_write_round_trip_in_memory() {
    let mut buf = [0u8; 24];
    let block = buf.as_mut_ptr();
    unsafe {
      write_header(block, Header::new(3, true, 3));
      let h = read_header(block);
      assert_eq!(h.size(), 3);
      assert!(h.alloc());
      assert_eq!(h.class_index(), 3);

      let footer = footer_ptr(block, h.payload_units());
      write_footer(footer, h);
      assert_eq!(read_footer(footer), h);
    }
  }
}
