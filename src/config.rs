//! Allocator tunables that do not affect the on-heap binary layout.
//!
//! Word size, alignment, `MIN`, boundary-tag packing, and `NLISTS` are
//! fixed by the external contract for binary-layout compatibility and are
//! not configurable. The only knob is how aggressively the heap grows
//! when a fit can't be found.

/// Heap-extension granularity used when `init` first grows the heap and
/// whenever `find_fit` comes up empty. The reference allocator's final
/// revision uses 256 words; earlier revisions used 1024. Either is a
/// valid choice as long as it is at least `MIN_BLOCK_WORDS`.
pub const DEFAULT_CHUNKSIZE_WORDS: u32 = 256;

/// Runtime-tunable heap behavior.
#[derive(Debug, Clone, Copy)]
pub struct HeapConfig {
  pub chunksize_words: u32,
}

impl HeapConfig {
  /// Configuration matching the reference allocator's final revision.
  pub const fn new(chunksize_words: u32) -> Self {
    Self { chunksize_words }
  }
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new(DEFAULT_CHUNKSIZE_WORDS)
  }
}
