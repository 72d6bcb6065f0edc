//! # Heap Invariant Checker
//!
//! Four independent consistency sweeps, gated behind the `checked-heap`
//! feature so a release build pays nothing for it. `Heap::check` runs all
//! four and reports the first failure; it never attempts to repair
//! anything — that's on the caller (or, in practice, on whoever is
//! debugging the call sequence that triggered it).

use crate::block::{blk_size, header, next_blk_header, payload_ptr, prev_blk_footer};
use crate::error::{CheckKind, RallocError};
use crate::heap::Heap;
use crate::list::ListElem;

impl Heap {
  /// Runs all four sweeps, short-circuiting on the first failure.
  pub fn check(&self) -> Result<(), RallocError> {
    self.check_free_list_marked_free()?;
    self.check_no_missed_coalesce()?;
    self.check_free_block_is_listed()?;
    self.check_heap_is_contiguous()?;
    Ok(())
  }

  /// Every block reachable through a segregated list must be free.
  fn check_free_list_marked_free(&self) -> Result<(), RallocError> {
    let mut ok = true;
    unsafe {
      self.seg.for_each(|b| {
        if header(b).inuse() {
          ok = false;
        }
      });
    }
    if ok {
      Ok(())
    } else {
      Err(RallocError::InvariantViolation { check: CheckKind::FreeListMarkedFree })
    }
  }

  /// Neither neighbor of a free-listed block may itself be free — if one
  /// were, it should have been absorbed by coalescing already.
  fn check_no_missed_coalesce(&self) -> Result<(), RallocError> {
    let mut ok = true;
    unsafe {
      self.seg.for_each(|b| {
        let prev_free = !prev_blk_footer(b).inuse();
        let next_free = !next_blk_header(b).inuse();
        if prev_free || next_free {
          ok = false;
        }
      });
    }
    if ok {
      Ok(())
    } else {
      Err(RallocError::InvariantViolation { check: CheckKind::NoMissedCoalesce })
    }
  }

  /// Walking the heap linearly, every free block must carry non-null list
  /// linkage (i.e. it really is threaded into a segregated list).
  fn check_free_block_is_listed(&self) -> Result<(), RallocError> {
    let mut ok = true;
    self.walk_heap(|b| {
      if !unsafe { header(b) }.inuse() {
        let link = payload_ptr(b) as *mut ListElem;
        let (prev, next) = unsafe { ((*link).prev, (*link).next) };
        if prev.is_null() || next.is_null() {
          ok = false;
        }
      }
    });
    if ok {
      Ok(())
    } else {
      Err(RallocError::InvariantViolation { check: CheckKind::FreeBlockIsListed })
    }
  }

  /// The linear heap walk must cover every word between the two FENCEs
  /// without reading an invalid `inuse` bit (always 0 or 1 by
  /// construction, so this mainly confirms the walk terminates cleanly).
  fn check_heap_is_contiguous(&self) -> Result<(), RallocError> {
    let lo = self.heap_lo() as *mut u32;
    let hi = self.heap_hi() as *mut u32;
    if lo.is_null() || hi.is_null() {
      // Heap not yet initialized: trivially contiguous (empty).
      return Ok(());
    }

    let mut ok = true;
    self.walk_heap(|b| {
      if (b as *mut u32) < lo || (b as *mut u32) >= hi {
        ok = false;
      }
    });
    if ok {
      Ok(())
    } else {
      Err(RallocError::InvariantViolation { check: CheckKind::HeapIsContiguous })
    }
  }

  /// Walks every real block from just past the opening FENCE to the
  /// epilogue, in address order.
  fn walk_heap(&self, mut visit: impl FnMut(*mut u32)) {
    let lo = self.heap_lo() as *mut u32;
    if lo.is_null() {
      return;
    }
    let mut cur = unsafe { lo.add(1) };
    loop {
      let tag = unsafe { header(cur) };
      if tag.is_fence() {
        break;
      }
      visit(cur);
      cur = unsafe { cur.add(blk_size(cur) as usize) };
    }
  }
}

#[cfg(test)]
mod tests {
  use crate::config::HeapConfig;
  use crate::heap::Heap;

  fn boxed_heap() -> Box<Heap> {
    Box::new(Heap::new(HeapConfig::default()))
  }

  #[test]
  fn fresh_heap_after_malloc_and_free_passes_all_checks() {
    let mut heap = boxed_heap();
    let p = heap.malloc(64);
    assert!(heap.check().is_ok());
    heap.free(p);
    assert!(heap.check().is_ok());
  }

  #[test]
  fn interleaved_allocations_pass_all_checks() {
    let mut heap = boxed_heap();
    let a = heap.malloc(16);
    let b = heap.malloc(32);
    let c = heap.malloc(8);
    heap.free(b);
    assert!(heap.check().is_ok());
    heap.free(a);
    heap.free(c);
    assert!(heap.check().is_ok());
  }
}
