//! # Region Provider
//!
//! Wraps `sbrk(2)` behind a typed `Result` instead of relying on the
//! caller to compare against the `(void*)-1` sentinel by hand, and tracks
//! the low/high watermark of the region it has handed out so far.
//!
//! This module is the *only* code in the crate that calls into `libc::sbrk`;
//! every other module reaches the heap only through `Heap`'s block
//! primitives.

use std::ptr;

use libc::{c_void, intptr_t, sbrk};

use crate::error::RallocError;

/// An `sbrk`-backed contiguous memory region.
///
/// `sbrk(n)` always returns bytes contiguous with the end of the previous
/// call, so the region only ever grows and its low watermark is fixed at
/// the first successful call.
pub struct RegionProvider {
  lo: *mut u8,
  hi: *mut u8,
}

impl RegionProvider {
  pub const fn new() -> Self {
    Self { lo: ptr::null_mut(), hi: ptr::null_mut() }
  }

  /// Requests `n_bytes` freshly committed bytes contiguous with the
  /// previous call. Returns a pointer to the base of the new bytes.
  pub fn sbrk(&mut self, n_bytes: usize) -> Result<*mut u8, RallocError> {
    let raw = unsafe { sbrk(n_bytes as intptr_t) };
    if raw as usize == usize::MAX {
      return Err(RallocError::RegionFailure);
    }

    let base = raw as *mut u8;
    if self.lo.is_null() {
      self.lo = base;
    }
    self.hi = unsafe { base.add(n_bytes) };
    Ok(base)
  }

  /// Current low watermark of the region (null before the first `sbrk`).
  pub fn heap_lo(&self) -> *mut u8 {
    self.lo
  }

  /// Current high watermark of the region (null before the first `sbrk`).
  pub fn heap_hi(&self) -> *mut u8 {
    self.hi
  }
}

impl Default for RegionProvider {
  fn default() -> Self {
    Self::new()
  }
}

/// Debug helper reporting the current program break via `sbrk(0)`, which
/// is always safe to call.
pub fn print_break(label: &str) {
  let brk = unsafe { sbrk(0 as intptr_t) };
  log::trace!("[{label}] program break = {:?}", brk as *const c_void);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sbrk_grows_contiguously() {
    let mut region = RegionProvider::new();
    let a = region.sbrk(64).unwrap();
    let b = region.sbrk(32).unwrap();
    assert_eq!(unsafe { a.add(64) }, b);
    assert_eq!(region.heap_hi(), unsafe { b.add(32) });
  }

  #[test]
  fn heap_lo_is_fixed_at_first_call() {
    let mut region = RegionProvider::new();
    assert!(region.heap_lo().is_null());
    let a = region.sbrk(16).unwrap();
    region.sbrk(16).unwrap();
    assert_eq!(region.heap_lo(), a);
  }
}
