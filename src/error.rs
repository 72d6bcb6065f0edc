//! Error types surfaced internally by the allocator core.
//!
//! The public `malloc`/`free`/`realloc` surface stays pointer-in/pointer-out
//! per the allocator ABI (no `Result` at that boundary — callers behave
//! like any C allocator), but everything underneath threads a typed error
//! so failures are logged with context before being collapsed to `null`.

use thiserror::Error;

/// One of the four independent heap consistency sweeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
  /// Every block reachable through a segregated list must be marked free.
  FreeListMarkedFree,
  /// Neither neighbor of a free-listed block may itself be free.
  NoMissedCoalesce,
  /// Every free block encountered during a linear heap walk must be listed.
  FreeBlockIsListed,
  /// The linear heap walk must cover every word between the two fences.
  HeapIsContiguous,
}

impl std::fmt::Display for CheckKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let name = match self {
      CheckKind::FreeListMarkedFree => "free-list-marked-free",
      CheckKind::NoMissedCoalesce => "no-missed-coalesce",
      CheckKind::FreeBlockIsListed => "free-block-is-listed",
      CheckKind::HeapIsContiguous => "heap-is-contiguous",
    };
    f.write_str(name)
  }
}

/// Errors produced by the allocator core.
#[derive(Debug, Error)]
pub enum RallocError {
  /// The region provider refused to grow the heap further.
  #[error("region provider refused to extend the heap by {requested_words} words")]
  OutOfMemory { requested_words: usize },

  /// The region provider's `sbrk` call failed outright (e.g. the
  /// underlying `libc::sbrk` returned its error sentinel).
  #[error("region provider sbrk call failed")]
  RegionFailure,

  /// A heap invariant checker sweep found a violation.
  #[error("heap invariant violated: {check}")]
  InvariantViolation { check: CheckKind },
}
