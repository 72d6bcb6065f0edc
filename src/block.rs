//! # Block Primitives
//!
//! Pure pointer arithmetic over the on-heap block layout: boundary-tag
//! accessors and neighbor navigation. Nothing in this module touches a
//! free list — that is `seglist`'s job.
//!
//! A block pointer is always a `*mut u32` pointing at the block's header
//! word. Sizes are measured in words (`WORD = 4` bytes), matching the
//! allocator's internal unit throughout.

use crate::list::ListElem;
use crate::tag::BoundaryTag;

/// Bytes per word; the allocator's internal size unit.
pub const WORD: usize = 4;
/// Bytes per doubleword; the alignment every payload pointer satisfies.
pub const DWORD: usize = 8;
/// Minimum block size, in words: header + footer + enough interior words
/// to hold a free block's embedded `ListElem` (two native pointers). On a
/// 64-bit target that's 16 bytes of interior, i.e. 4 words, for 6 words
/// total.
pub const MIN_BLOCK_WORDS: u32 = 6;

const _: () = assert!(
  (MIN_BLOCK_WORDS as usize - 2) * WORD >= std::mem::size_of::<ListElem>(),
  "MIN_BLOCK_WORDS must leave room for a free block's embedded ListElem"
);

/// Reads the header tag of the block at `b`.
///
/// # Safety
/// `b` must point at a live block's header word.
#[inline]
pub unsafe fn header(b: *mut u32) -> BoundaryTag {
  unsafe { BoundaryTag::from_raw(*b) }
}

/// Size of the block at `b`, in words (read from its header).
///
/// # Safety
/// `b` must point at a live block's header word.
#[inline]
pub unsafe fn blk_size(b: *mut u32) -> u32 {
  unsafe { header(b).size() }
}

/// Pointer to the footer tag of the block at `b`, given its word size `n`.
///
/// # Safety
/// `b` must point at a live block's header word and `n` must be that
/// block's size.
#[inline]
pub unsafe fn footer_ptr(b: *mut u32, n: u32) -> *mut u32 {
  unsafe { b.add(n as usize - 1) }
}

/// The tag immediately preceding `b`'s header — the previous block's
/// footer. Well-defined even for the left-most real block, since the
/// opening FENCE sits one word before it.
///
/// # Safety
/// `b` must not be the very first word of the heap region (there must be
/// a tag one word before it — guaranteed by the opening FENCE).
#[inline]
pub unsafe fn prev_blk_footer(b: *mut u32) -> BoundaryTag {
  unsafe { BoundaryTag::from_raw(*b.sub(1)) }
}

/// The tag at `b + size(b)` words — the next block's header. Well-defined
/// even for the right-most real block, since the epilogue FENCE sits
/// immediately after it.
///
/// # Safety
/// `b` must point at a live block's header word.
#[inline]
pub unsafe fn next_blk_header(b: *mut u32) -> BoundaryTag {
  unsafe {
    let n = blk_size(b);
    BoundaryTag::from_raw(*b.add(n as usize))
  }
}

/// Pointer to the previous block, given that its footer reports a
/// nonzero size (i.e. it is a real block, not the opening FENCE).
///
/// # Safety
/// The preceding footer must belong to a real block (`size != 0`); callers
/// check `prev_blk_footer(b).inuse()` state first and only call this when
/// they already know the previous neighbor is a real (non-FENCE) block.
#[inline]
pub unsafe fn prev_blk(b: *mut u32) -> *mut u32 {
  unsafe {
    let prev_footer_size = prev_blk_footer(b).size();
    debug_assert!(prev_footer_size != 0, "prev_blk called at the heap's left edge");
    b.sub(prev_footer_size as usize)
  }
}

/// Pointer to the next block, given that `b` itself has nonzero size
/// (true of every real block; never call this on a FENCE).
///
/// # Safety
/// `b` must point at a real (non-FENCE) block.
#[inline]
pub unsafe fn next_blk(b: *mut u32) -> *mut u32 {
  unsafe {
    let n = blk_size(b);
    debug_assert!(n != 0, "next_blk called on a zero-sized (FENCE) block");
    b.add(n as usize)
  }
}

/// Writes `{inuse: true, size: n}` to both header and footer of the block
/// at `b`.
///
/// # Safety
/// `b` must point at `n` words of valid, owned heap memory.
#[inline]
pub unsafe fn mark_used(b: *mut u32, n: u32) {
  unsafe {
    let tag = BoundaryTag::pack(true, n);
    *b = tag.raw();
    *footer_ptr(b, n) = tag.raw();
  }
}

/// Writes `{inuse: false, size: n}` to both header and footer of the block
/// at `b`.
///
/// # Safety
/// `b` must point at `n` words of valid, owned heap memory.
#[inline]
pub unsafe fn mark_free(b: *mut u32, n: u32) {
  unsafe {
    let tag = BoundaryTag::pack(false, n);
    *b = tag.raw();
    *footer_ptr(b, n) = tag.raw();
  }
}

/// Payload base address for the block at `b`: one word past the header,
/// which invariant (6) guarantees is 8-aligned.
#[inline]
pub fn payload_ptr(b: *mut u32) -> *mut u8 {
  unsafe { b.add(1) as *mut u8 }
}

/// Recovers a block's header pointer from a payload pointer previously
/// returned by `payload_ptr`.
#[inline]
pub fn block_from_payload(p: *mut u8) -> *mut u32 {
  unsafe { (p as *mut u32).sub(1) }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// A small owned word buffer standing in for a slice of heap memory,
  /// with fence words at both ends so `prev_blk_footer`/`next_blk_header`
  /// stay in-bounds.
  struct TestHeap {
    words: Vec<u32>,
  }

  impl TestHeap {
    fn new(block_words: u32) -> Self {
      let mut words = vec![0u32; 1 + block_words as usize + 1];
      words[0] = BoundaryTag::FENCE.raw();
      *words.last_mut().unwrap() = BoundaryTag::FENCE.raw();
      Self { words }
    }

    fn block_ptr(&mut self) -> *mut u32 {
      unsafe { self.words.as_mut_ptr().add(1) }
    }
  }

  #[test]
  fn mark_used_then_free_roundtrips_header_and_footer() {
    let mut heap = TestHeap::new(6);
    let b = heap.block_ptr();
    unsafe {
      mark_used(b, 6);
      assert!(header(b).inuse());
      assert_eq!(blk_size(b), 6);
      assert_eq!(*footer_ptr(b, 6), header(b).raw());

      mark_free(b, 6);
      assert!(!header(b).inuse());
      assert_eq!(*footer_ptr(b, 6), header(b).raw());
    }
  }

  #[test]
  fn neighbor_tags_read_the_fences_at_heap_edges() {
    let mut heap = TestHeap::new(6);
    let b = heap.block_ptr();
    unsafe {
      mark_free(b, 6);
      assert!(prev_blk_footer(b).is_fence());
      assert!(next_blk_header(b).is_fence());
    }
  }

  #[test]
  fn prev_and_next_blk_navigate_between_two_real_blocks() {
    let mut words = vec![0u32; 1 + 6 + 6 + 1];
    words[0] = BoundaryTag::FENCE.raw();
    *words.last_mut().unwrap() = BoundaryTag::FENCE.raw();
    let base = words.as_mut_ptr();
    unsafe {
      let first = base.add(1);
      let second = base.add(1 + 6);
      mark_free(first, 6);
      mark_free(second, 6);

      assert_eq!(next_blk(first), second);
      assert_eq!(prev_blk(second), first);
    }
  }
}
