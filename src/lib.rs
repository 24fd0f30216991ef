//! # linkalloc — a segregated-fit, sbrk-backed dynamic memory allocator
//!
//! A single-threaded malloc/free/realloc implementation over a simulated
//! `sbrk`-style heap arena, in two variants:
//!
//! ```text
//!   Segregated free-list layout:
//!
//!   class:   0   1   2   3   4   5   6  |   7     8      9      10
//!   size:    1   2   3   4   5   6   7  | 8-14  15-30  31-62   63+
//!            └────────── exact ────────┘ └────────── searched ──────┘
//!              served head-first            first-fit, then escalate
//! ```
//!
//! `SingleLinkAllocator` blocks carry only a header; `DoubleLinkAllocator`
//! blocks carry a header *and* a footer, which lets `realloc` coalesce
//! with a freed predecessor (left-coalescing) as well as a freed
//! successor. Both variants share one generic implementation,
//! [`Allocator<const DOUBLE: bool>`](Allocator), picking the block layout
//! at compile time.
//!
//! ## Crate structure
//!
//! ```text
//!   linkalloc
//!   ├── align      - byte/unit conversion
//!   ├── class      - segregated size-class table
//!   ├── block      - packed header/footer value type
//!   ├── freelist   - per-class doubly-linked free chains
//!   ├── heap       - simulated sbrk arena
//!   └── allocator  - malloc/free/realloc over the above
//! ```
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use linkalloc::SingleLinkAllocator;
//!
//! let mut a = SingleLinkAllocator::new();
//! let p = a.malloc(64);
//! unsafe { *p = 42 };
//! let p = a.realloc(p, 256);
//! a.free(p);
//! ```
//!
//! ## Safety
//!
//! This crate is inherently unsafe: it manages its own heap memory by raw
//! pointer and bit-packed header, outside the normal `std::alloc` path.
//! `malloc`/`free`/`realloc` are safe to *call*, but misuse of the
//! pointers they hand back (double free, use-after-free, wrong-allocator
//! free) is a contract violation, not a panic — see
//! [`allocator`]'s module docs for how those are handled.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives.
//! - **No shrink-to-OS**: freed memory returns to the free-list index,
//!   never back to the host; the arena only grows.

pub mod align;
mod allocator;
mod block;
mod class;
mod freelist;
mod heap;

pub use allocator::{Allocator, DoubleLinkAllocator, SingleLinkAllocator};
