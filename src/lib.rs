//! # rallocator - A Segregated-Fit Memory Allocator
//!
//! This crate provides a general-purpose dynamic memory allocator over a
//! single contiguous heap region grown via `sbrk(2)`. Unlike a pure bump
//! allocator, freed memory is tracked in size-class free lists and reused
//! by later allocations instead of being wasted.
//!
//! ## Overview
//!
//! Every block on the heap carries a boundary tag — a packed
//! `(inuse, size)` record — at both its start and its end:
//!
//! ```text
//!   Allocated block:
//!   ┌────────┬─────────────────────────────┬────────┐
//!   │ header │           payload           │ footer │
//!   └────────┴─────────────────────────────┴────────┘
//!
//!   Free block:
//!   ┌────────┬───────────────┬─────────────┬────────┐
//!   │ header │ prev/next ptr │   unused    │ footer │
//!   └────────┴───────────────┴─────────────┴────────┘
//! ```
//!
//! Free blocks are threaded into one of `NLISTS` segregated lists, bucketed
//! by the position of the size's highest set bit. Allocation does a
//! first-fit scan starting at the requesting bucket; freeing coalesces
//! with free neighbors via the boundary tags before reinserting.
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── tag      - boundary tag packing
//!   ├── block    - block primitives (header/footer, neighbor navigation)
//!   ├── list     - intrusive doubly-linked list (embedded in free blocks)
//!   ├── seglist  - the NLISTS segregated free-list index
//!   ├── region   - sbrk-backed region provider
//!   ├── config   - heap-extension tunables
//!   ├── error    - RallocError, surfaced internally
//!   ├── heap     - Heap: init/malloc/free/realloc
//!   ├── check    - heap invariant checker (feature "checked-heap")
//!   └── global   - GlobalAlloc adapter (feature "global")
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rallocator::Heap;
//!
//! let mut heap = Box::new(Heap::default());
//!
//! unsafe {
//!     let ptr = heap.malloc(64) as *mut u64;
//!     assert!(!ptr.is_null());
//!     *ptr = 42;
//!     assert_eq!(*ptr, 42);
//!     heap.free(ptr as *mut u8);
//! }
//! ```
//!
//! ## Limitations
//!
//! - **Single-threaded core**: no internal locking; see `global::GlobalHeap`
//!   for a `Mutex`-wrapped adapter if cross-thread use is needed.
//! - **Heap only grows**: freed memory is reused, but never returned to the OS.
//! - **Unix-only**: requires `libc::sbrk` (POSIX systems).
//!
//! ## Safety
//!
//! This crate manages raw memory directly. `Heap` must stay pinned in
//! place once `init` has run (see the `list` module's docs); all pointer
//! operations that can violate that, or hand out aliasing payloads,
//! require `unsafe`.

mod block;
mod config;
mod error;
mod heap;
mod list;
mod region;
mod seglist;
mod tag;

#[cfg(feature = "checked-heap")]
mod check;

#[cfg(feature = "global")]
mod global;

pub use config::{DEFAULT_CHUNKSIZE_WORDS, HeapConfig};
pub use error::{CheckKind, RallocError};
pub use heap::{BlockSnapshot, Heap};
pub use region::print_break;

#[cfg(feature = "global")]
pub use global::GlobalHeap;
