//! Optional `#[global_allocator]` adapter, gated behind the `global`
//! feature. `Heap` already exposes a pointer-in/pointer-out API that maps
//! directly onto `GlobalAlloc`; this just bridges `Layout` to `size_bytes`
//! and wraps the allocator in the `UnsafeCell`-free interior mutability
//! `GlobalAlloc` requires (a `Mutex`, since `Heap` has no internal
//! synchronization of its own — see the allocator's concurrency model).

use std::alloc::{GlobalAlloc, Layout};
use std::sync::Mutex;

use crate::config::HeapConfig;
use crate::heap::Heap;

/// A `GlobalAlloc` adapter around `Heap`.
///
/// `Heap` itself has no internal locking (the core is explicitly
/// single-threaded); this wrapper supplies the external synchronization
/// the allocator's contract requires for any multi-threaded caller,
/// including the Rust runtime's own global allocator slot.
pub struct GlobalHeap {
  inner: Mutex<Heap>,
}

impl GlobalHeap {
  pub const fn new(config: HeapConfig) -> Self {
    Self { inner: Mutex::new(Heap::new(config)) }
  }
}

unsafe impl GlobalAlloc for GlobalHeap {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    let mut heap = self.inner.lock().unwrap_or_else(|poison| poison.into_inner());
    // The allocator itself only guarantees 8-byte alignment; requests
    // for a stricter alignment aren't supported by this core.
    debug_assert!(layout.align() <= 8, "GlobalHeap only supports alignments up to 8 bytes");
    heap.malloc(layout.size())
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    let mut heap = self.inner.lock().unwrap_or_else(|poison| poison.into_inner());
    heap.free(ptr);
  }

  unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
    let mut heap = self.inner.lock().unwrap_or_else(|poison| poison.into_inner());
    heap.realloc(ptr, new_size)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn alloc_dealloc_roundtrip() {
    let global = GlobalHeap::new(HeapConfig::default());
    let layout = Layout::from_size_align(64, 8).unwrap();
    unsafe {
      let p = global.alloc(layout);
      assert!(!p.is_null());
      global.dealloc(p, layout);
    }
  }
}
