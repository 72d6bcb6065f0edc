//! # Segregated Free-List Index
//!
//! `NLISTS` size-class buckets, each a size-ordered intrusive list of free
//! blocks. List `k` holds blocks whose word-size falls in `[2^k, 2^(k+1))`;
//! the last bucket absorbs everything at or above `2^(NLISTS-1)`.
//!
//! Within a bucket, blocks are kept in non-decreasing size order so that
//! `find_fit`'s first-fit walk approximates best-fit.

use crate::block::{blk_size, payload_ptr};
use crate::list::{List, ListElem};

/// Number of segregated size-class buckets. Fixed for binary-layout
/// compatibility per the allocator's external contract.
pub const NLISTS: usize = 20;

/// The element type linked into a bucket: stored at the same offset a used
/// block's payload would occupy (see `block::payload_ptr`).
pub type FreeLink = ListElem;

/// Largest `k < NLISTS` with `2^k <= n`, found the way the reference
/// allocator does it: shift right until a single bit (or bucket cap) is
/// hit, rather than a leading-zeros computation, so the boundary behavior
/// at `NLISTS - 1` matches exactly.
pub fn bucket(n: u32) -> usize {
  let mut n = n;
  let mut k = 0usize;
  while k < NLISTS - 1 && n > 1 {
    n >>= 1;
    k += 1;
  }
  k
}

/// Recovers a block pointer from a list element embedded in its payload.
fn block_of(e: *mut ListElem) -> *mut u32 {
  unsafe { (e as *mut u32).sub(1) }
}

/// Pointer to the `ListElem` embedded in the free block at `b`.
fn link_of(b: *mut u32) -> *mut ListElem {
  payload_ptr(b) as *mut ListElem
}

/// The `NLISTS`-bucket segregated free list.
pub struct SegList {
  lists: [List; NLISTS],
}

impl SegList {
  pub const fn new() -> Self {
    // `List::new()` is `const fn`, so this avoids requiring `Copy`/`Default`
    // array-init helpers for a fixed-size array of non-Copy lists.
    const EMPTY: List = List::new();
    Self { lists: [EMPTY; NLISTS] }
  }

  pub fn init(&mut self) {
    for list in &mut self.lists {
      list.init();
    }
  }

  /// Whether `init` has run (mirrors `List::is_initialized` on bucket 0,
  /// the allocator's lazy-init sentinel check).
  pub fn is_initialized(&self) -> bool {
    self.lists[0].is_initialized()
  }

  /// Inserts the free block at `b` (word-size `n`) into its bucket, in
  /// non-decreasing size order.
  ///
  /// # Safety
  /// `b` must point at a free block of word-size `n` that is not already
  /// linked into any list.
  pub unsafe fn insert(&mut self, b: *mut u32, n: u32) {
    let list = &mut self.lists[bucket(n)];
    let e = link_of(b);

    if list.empty() {
      list.push_front(e);
      return;
    }

    let mut pos = list.begin();
    while pos != list.end() {
      let existing_size = unsafe { blk_size(block_of(pos)) };
      if existing_size >= n {
        break;
      }
      pos = unsafe { List::next(pos) };
    }
    list.insert_before(pos, e);
  }

  /// Removes the free block at `b` (word-size `n`) from its bucket.
  ///
  /// # Safety
  /// `b` must currently be linked into the bucket matching word-size `n`.
  pub unsafe fn remove(&mut self, b: *mut u32, n: u32) {
    debug_assert!(
      unsafe { self.bucket_contains(bucket(n), b) },
      "remove() called with a block not linked into the bucket matching its size"
    );
    List::remove(link_of(b));
  }

  /// Linear scan used only by `debug_assert!`s to confirm `b` is actually
  /// linked into bucket `k` before mutating its links.
  ///
  /// # Safety
  /// Every block linked into bucket `k` must be a live free block.
  unsafe fn bucket_contains(&self, k: usize, b: *mut u32) -> bool {
    let list = &self.lists[k];
    if !list.is_initialized() {
      return false;
    }
    let mut pos = list.begin();
    while pos != list.end() {
      if block_of(pos) == b {
        return true;
      }
      pos = unsafe { List::next(pos) };
    }
    false
  }

  /// Visits every block currently linked into any bucket. Used by the
  /// heap invariant checker, which needs to cross-reference the listed
  /// blocks against a linear heap walk.
  ///
  /// # Safety
  /// Every block linked into `self` must be a live free block.
  pub unsafe fn for_each<F: FnMut(*mut u32)>(&self, mut f: F) {
    for list in &self.lists {
      if !list.is_initialized() || list.empty() {
        continue;
      }
      let mut pos = list.begin();
      while pos != list.end() {
        f(block_of(pos));
        pos = unsafe { List::next(pos) };
      }
    }
  }

  /// First-fit search starting from `bucket(n)` and scanning upward.
  /// Because each bucket is size-ordered, the first hit in the starting
  /// bucket is the tightest fit available there.
  ///
  /// # Safety
  /// Every block linked into `self` must be a live free block.
  pub unsafe fn find_fit(&self, n: u32) -> Option<*mut u32> {
    for k in bucket(n)..NLISTS {
      let list = &self.lists[k];
      if list.empty() {
        continue;
      }
      let mut pos = list.begin();
      while pos != list.end() {
        let b = block_of(pos);
        if unsafe { blk_size(b) } >= n {
          return Some(b);
        }
        pos = unsafe { List::next(pos) };
      }
    }
    None
  }
}

impl Default for SegList {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::mark_free;
  use crate::tag::BoundaryTag;

  fn make_block(words: &mut [u32], size: u32) -> *mut u32 {
    let b = words.as_mut_ptr();
    unsafe { mark_free(b, size) };
    b
  }

  fn fenced(total_words: usize) -> Vec<u32> {
    let mut words = vec![0u32; total_words + 2];
    words[0] = BoundaryTag::FENCE.raw();
    *words.last_mut().unwrap() = BoundaryTag::FENCE.raw();
    words
  }

  #[test]
  fn bucket_is_monotonic_and_capped() {
    assert_eq!(bucket(1), 0);
    assert_eq!(bucket(2), 1);
    assert_eq!(bucket(3), 1);
    assert_eq!(bucket(4), 2);
    assert_eq!(bucket(1 << 25), NLISTS - 1);
  }

  #[test]
  fn insert_then_find_fit_returns_the_block() {
    let mut storage = fenced(6);
    let b = make_block(&mut storage[1..], 6);

    let mut seg = SegList::new();
    seg.init();
    unsafe {
      seg.insert(b, 6);
      assert_eq!(seg.find_fit(6), Some(b));
      assert_eq!(seg.find_fit(8), None);
    }
  }

  #[test]
  fn insert_keeps_bucket_in_non_decreasing_size_order() {
    let mut s1 = fenced(6);
    let mut s2 = fenced(6);
    let mut s3 = fenced(7);
    let b1 = make_block(&mut s1[1..], 6);
    let b2 = make_block(&mut s2[1..], 6);
    let b3 = make_block(&mut s3[1..], 7);

    let mut seg = SegList::new();
    seg.init();
    unsafe {
      // Same bucket (k=2, range [4,8)) for sizes 6 and 7.
      seg.insert(b3, 7);
      seg.insert(b1, 6);
      seg.insert(b2, 6);

      // First-fit for size 7 must skip the two MIN-sized (6-word) blocks.
      assert_eq!(seg.find_fit(7), Some(b3));
    }
  }

  #[test]
  fn remove_takes_the_block_out_of_its_bucket() {
    let mut storage = fenced(6);
    let b = make_block(&mut storage[1..], 6);

    let mut seg = SegList::new();
    seg.init();
    unsafe {
      seg.insert(b, 6);
      seg.remove(b, 6);
      assert_eq!(seg.find_fit(6), None);
    }
  }
}
