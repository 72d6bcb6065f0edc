//! # Top-Level Allocator API
//!
//! `Heap` ties the region provider, segregated free-list index, placement
//! engine, and coalescing engine together into the four public operations:
//! `init`, `malloc`, `free`, `realloc`.
//!
//! Data flow: `malloc` adjusts the requested size to a word count, tries
//! `find_fit`, and on a hit calls `place`; on a miss it calls `extend_heap`
//! (the only path that talks to the region provider) and places into the
//! freshly grown block. `free` marks a block free and folds it back into
//! its neighbors via `coalesce`. `realloc` tries four no-copy fast paths
//! before falling back to allocate-copy-free.
//!
//! # Safety
//!
//! `Heap` must not be moved once `init` has run — the segregated list's
//! sentinel nodes hold self-referential pointers (see `list` module docs).
//! Keep it behind a `Box`, a `static`, or otherwise pinned in place.

use std::ptr;

use crate::block::{
  self, MIN_BLOCK_WORDS, WORD, blk_size, block_from_payload, footer_ptr, header, mark_free,
  mark_used, next_blk, next_blk_header, payload_ptr, prev_blk, prev_blk_footer,
};
use crate::config::HeapConfig;
use crate::error::RallocError;
use crate::list::ListElem;
use crate::region::RegionProvider;
use crate::seglist::SegList;
use crate::tag::BoundaryTag;

/// A segregated-fit allocator over a single `sbrk`-backed heap region.
pub struct Heap {
  pub(crate) region: RegionProvider,
  pub(crate) seg: SegList,
  config: HeapConfig,
}

impl Heap {
  pub const fn new(config: HeapConfig) -> Self {
    Self { region: RegionProvider::new(), seg: SegList::new(), config }
  }

  /// Initializes the segregated lists, lays down the opening/closing
  /// FENCEs, and grows the heap by one chunk. Idempotent in the sense
  /// that calling it again after a from-scratch `Heap` re-runs the same
  /// steps; there is no `teardown` to undo it.
  pub fn init(&mut self) -> Result<(), RallocError> {
    self.seg.init();

    let fences = self.region.sbrk(2 * WORD)?;
    let fence_words = fences as *mut u32;
    unsafe {
      *fence_words = BoundaryTag::FENCE.raw(); // prologue footer
      *fence_words.add(1) = BoundaryTag::FENCE.raw(); // epilogue header
    }

    self.extend_heap(self.config.chunksize_words)?;
    log::debug!("heap initialized, chunksize = {} words", self.config.chunksize_words);

    #[cfg(feature = "checked-heap")]
    self.check().map_err(|e| {
      log::warn!("heap check failed right after init: {e}");
      e
    })?;

    Ok(())
  }

  fn lazy_init(&mut self) -> bool {
    if self.seg.is_initialized() {
      return true;
    }
    match self.init() {
      Ok(()) => true,
      Err(e) => {
        log::warn!("lazy heap init failed: {e}");
        false
      }
    }
  }

  /// Adjusts a requested payload size (bytes) to a word count covering
  /// header, footer, alignment padding, and the `MIN` floor.
  fn words_needed(size_bytes: usize) -> u32 {
    let with_tags = size_bytes + 2 * WORD;
    let aligned = (with_tags + block::DWORD - 1) & !(block::DWORD - 1);
    ((aligned / WORD) as u32).max(MIN_BLOCK_WORDS)
  }

  pub fn malloc(&mut self, size_bytes: usize) -> *mut u8 {
    if !self.lazy_init() {
      return ptr::null_mut();
    }
    if size_bytes == 0 {
      return ptr::null_mut();
    }

    let n = Self::words_needed(size_bytes);

    let fit = unsafe { self.seg.find_fit(n) };
    let used = if let Some(b) = fit {
      unsafe { self.place(b, n) }
    } else {
      let extend_words = n.max(self.config.chunksize_words);
      let b = match self.extend_heap(extend_words) {
        Ok(b) => b,
        Err(e) => {
          log::warn!("malloc({size_bytes}) failed: {e}");
          return ptr::null_mut();
        }
      };
      unsafe { self.place(b, n) }
    };

    #[cfg(feature = "checked-heap")]
    if let Err(e) = self.check() {
      log::warn!("heap check failed after malloc: {e}");
    }

    payload_ptr(used)
  }

  pub fn free(&mut self, p: *mut u8) {
    if p.is_null() {
      return;
    }
    if !self.lazy_init() {
      return;
    }

    unsafe {
      let b = block_from_payload(p);
      let n = blk_size(b);
      mark_free(b, n);
      self.coalesce(b);
    }

    #[cfg(feature = "checked-heap")]
    if let Err(e) = self.check() {
      log::warn!("heap check failed after free: {e}");
    }
  }

  pub fn realloc(&mut self, p: *mut u8, size_bytes: usize) -> *mut u8 {
    if p.is_null() {
      return self.malloc(size_bytes);
    }
    if size_bytes == 0 {
      self.free(p);
      return ptr::null_mut();
    }

    let result = unsafe { self.realloc_in_place(p, size_bytes) };

    #[cfg(feature = "checked-heap")]
    if let Err(e) = self.check() {
      log::warn!("heap check failed after realloc: {e}");
    }

    result
  }

  /// The four no-copy fast paths, falling back to malloc+memcpy+free.
  ///
  /// # Safety
  /// `p` must be a live payload pointer previously returned by `malloc`
  /// or `realloc` on this heap.
  unsafe fn realloc_in_place(&mut self, p: *mut u8, size_bytes: usize) -> *mut u8 {
    unsafe {
      let old = block_from_payload(p);
      let old_words = blk_size(old);
      let need = Self::words_needed(size_bytes);

      // Case A: shrink (or exact fit) in place.
      if need <= old_words {
        if old_words - need >= MIN_BLOCK_WORDS {
          mark_used(old, need);
          let tail = old.add(need as usize);
          mark_free(tail, old_words - need);
          self.coalesce(tail);
        }
        return p;
      }

      let next = old.add(old_words as usize);
      let next_tag = header(next);

      if next_tag.is_fence() {
        // Case B: old is the last real block; extend and absorb.
        let shortfall = need - old_words;
        let extend_words = shortfall.max(self.config.chunksize_words);
        let grown = match self.extend_heap(extend_words) {
          Ok(b) => b,
          Err(e) => {
            log::warn!("realloc grow-at-end failed: {e}");
            return ptr::null_mut();
          }
        };
        let grown_size = blk_size(grown);
        self.seg.remove(grown, grown_size);
        mark_used(old, old_words + grown_size);
        return p;
      }

      if !next_tag.inuse() {
        let next_size = next_tag.size();

        if old_words + next_size >= need {
          // Case C: absorb the adjacent free block, splitting off a tail
          // if there's enough surplus to keep as its own free block.
          self.seg.remove(next, next_size);
          let total = old_words + next_size;
          if total - need >= MIN_BLOCK_WORDS {
            mark_used(old, need);
            let tail = old.add(need as usize);
            mark_free(tail, total - need);
            self.seg.insert(tail, total - need);
          } else {
            mark_used(old, total);
          }
          return p;
        }

        let next_next = next.add(next_size as usize);
        if header(next_next).is_fence() {
          // Case D: adjacent free block is too small, but it's the last
          // real block; extend the heap and absorb both.
          let shortfall = need - old_words - next_size;
          let extend_words = shortfall.max(self.config.chunksize_words);
          let merged = match self.extend_heap(extend_words) {
            Ok(b) => b,
            Err(e) => {
              log::warn!("realloc grow-adjacent-free failed: {e}");
              return ptr::null_mut();
            }
          };
          // extend_heap's coalesce absorbed the new bytes into `next`
          // (free, immediately preceding the new growth), which is what
          // it returns as the merged block.
          let merged_size = blk_size(merged);
          self.seg.remove(merged, merged_size);
          mark_used(old, old_words + merged_size);
          return p;
        }
      }

      // Fallback: allocate, copy what fits, free the old block.
      let new_ptr = self.malloc(size_bytes);
      if new_ptr.is_null() {
        return ptr::null_mut();
      }
      let old_payload_bytes = (old_words as usize) * WORD - 2 * WORD;
      let copy_len = old_payload_bytes.min(size_bytes);
      ptr::copy_nonoverlapping(p, new_ptr, copy_len);
      self.free(p);
      new_ptr
    }
  }

  /// Splits (if the remainder would be `>= MIN`) or fully consumes the
  /// free block at `b`, whose word-size is `n` or more, and marks the
  /// returned portion used. `b` is removed from its free list first; per
  /// the split policy, the free remainder is placed at the low address
  /// and the used portion at the high address.
  ///
  /// # Safety
  /// `b` must currently be linked into the segregated free list matching
  /// its size.
  unsafe fn place(&mut self, b: *mut u32, n: u32) -> *mut u32 {
    unsafe {
      let c = blk_size(b);
      self.seg.remove(b, c);

      if c - n >= MIN_BLOCK_WORDS {
        mark_free(b, c - n);
        self.seg.insert(b, c - n);
        let used = b.add((c - n) as usize);
        mark_used(used, n);
        used
      } else {
        mark_used(b, c);
        b
      }
    }
  }

  /// Boundary-tag coalescing. `b` has just been marked free but is not
  /// yet linked into any list; returns the (possibly larger) merged
  /// block, now linked into exactly one list.
  ///
  /// # Safety
  /// `b` must point at a free block not currently in any segregated list.
  unsafe fn coalesce(&mut self, b: *mut u32) -> *mut u32 {
    unsafe {
      let prev_alloc = prev_blk_footer(b).inuse();
      let next_alloc = next_blk_header(b).inuse();
      let size = blk_size(b);

      match (prev_alloc, next_alloc) {
        (true, true) => {
          self.seg.insert(b, size);
          b
        }
        (true, false) => {
          let next = next_blk(b);
          let next_size = blk_size(next);
          self.seg.remove(next, next_size);
          let total = size + next_size;
          mark_free(b, total);
          self.seg.insert(b, total);
          b
        }
        (false, true) => {
          let prev = prev_blk(b);
          let prev_size = blk_size(prev);
          self.seg.remove(prev, prev_size);
          let total = size + prev_size;
          mark_free(prev, total);
          self.seg.insert(prev, total);
          prev
        }
        (false, false) => {
          let next = next_blk(b);
          let prev = prev_blk(b);
          let next_size = blk_size(next);
          let prev_size = blk_size(prev);
          self.seg.remove(next, next_size);
          self.seg.remove(prev, prev_size);
          let total = size + next_size + prev_size;
          mark_free(prev, total);
          self.seg.insert(prev, total);
          prev
        }
      }
    }
  }

  /// Grows the heap by at least `words` (rounded up to an even number,
  /// floored at `MIN`), overlaying the old epilogue with the new block's
  /// header, and returns the coalesced result so an existing trailing
  /// free block absorbs the new space.
  fn extend_heap(&mut self, words: u32) -> Result<*mut u32, RallocError> {
    let mut words = (words + 1) & !1;
    if words < MIN_BLOCK_WORDS {
      words = MIN_BLOCK_WORDS;
    }

    let sbrk_result = self.region.sbrk(words as usize * WORD)?;
    let block = unsafe { (sbrk_result as *mut u32).sub(1) };

    unsafe {
      mark_free(block, words);
      let new_epilogue = block.add(words as usize);
      *new_epilogue = BoundaryTag::FENCE.raw();
    }

    log::trace!("extend_heap: grew by {words} words");
    Ok(unsafe { self.coalesce(block) })
  }

  /// Current heap extents, for the invariant checker and diagnostics.
  pub fn heap_lo(&self) -> *mut u8 {
    self.region.heap_lo()
  }

  pub fn heap_hi(&self) -> *mut u8 {
    self.region.heap_hi()
  }

  /// Walks every real block between the opening and closing FENCEs, in
  /// address order, and reports each one's boundary-tag state. Unlike
  /// `check` (gated behind the `checked-heap` feature, since it's meant to
  /// run on every public call in debug builds), this only reads memory the
  /// heap already owns and is always available — tests use it directly
  /// without needing any feature flag.
  pub fn debug_blocks(&self) -> Vec<BlockSnapshot> {
    let mut out = Vec::new();
    let lo = self.heap_lo() as *mut u32;
    if lo.is_null() {
      return out;
    }

    let mut cur = unsafe { lo.add(1) };
    loop {
      let tag = unsafe { header(cur) };
      if tag.is_fence() {
        break;
      }
      let n = tag.size();
      let footer = unsafe { *footer_ptr(cur, n) };
      let listed = if tag.inuse() {
        true
      } else {
        let link = payload_ptr(cur) as *mut ListElem;
        let (prev, next) = unsafe { ((*link).prev, (*link).next) };
        !prev.is_null() && !next.is_null()
      };

      out.push(BlockSnapshot {
        addr: cur as usize,
        words: n,
        inuse: tag.inuse(),
        header_matches_footer: footer == tag.raw(),
        listed,
      });
      cur = unsafe { cur.add(n as usize) };
    }
    out
  }
}

/// One block's boundary-tag state, as reported by `Heap::debug_blocks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSnapshot {
  pub addr: usize,
  pub words: u32,
  pub inuse: bool,
  /// Whether the block's header and footer tags are byte-identical.
  pub header_matches_footer: bool,
  /// For a free block, whether its embedded list node's `prev`/`next` are
  /// both non-null (i.e. actually threaded into a segregated list). Always
  /// `true` for an in-use block, where the question doesn't apply.
  pub listed: bool,
}

impl Default for Heap {
  fn default() -> Self {
    Self::new(HeapConfig::default())
  }
}
