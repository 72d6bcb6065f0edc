//! # Intrusive Doubly-Linked List
//!
//! A doubly-linked list whose node (`ListElem`, two raw pointers) is
//! embedded inside the element it links — here, inside a free block's
//! payload words, at the exact offset an allocated block's payload would
//! start. There is no separate allocation for list bookkeeping.
//!
//! The list uses two sentinel nodes, `head` and `tail`, so `insert_before`
//! and `remove` never need to special-case the ends of the list:
//!
//! ```text
//! head <-> elem_0 <-> elem_1 <-> ... <-> elem_n <-> tail
//! ```
//!
//! Before `init` is called, `head.next` is null (the `List` is zero-valued,
//! as it sits inside a static array). `Heap::malloc`/`Heap::free` use that
//! as the lazy-initialization check, per the external list contract.
//!
//! # Safety
//!
//! Once `init` has run, `head` and `tail` hold pointers to themselves; the
//! `List` must not move afterwards (the segregated list array lives inside
//! `Heap`, which callers are expected to keep pinned in place, e.g. behind
//! a `Box` or in a `static`, for the lifetime of the heap).

use std::ptr;

/// A list node. Embedded inside a free block's payload.
#[repr(C)]
pub struct ListElem {
  pub prev: *mut ListElem,
  pub next: *mut ListElem,
}

impl ListElem {
  pub const fn new() -> Self {
    Self { prev: ptr::null_mut(), next: ptr::null_mut() }
  }
}

impl Default for ListElem {
  fn default() -> Self {
    Self::new()
  }
}

/// A doubly-linked list of `ListElem` nodes with sentinel head/tail.
pub struct List {
  head: ListElem,
  tail: ListElem,
}

impl List {
  pub const fn new() -> Self {
    Self { head: ListElem::new(), tail: ListElem::new() }
  }

  /// Wires the sentinels together. Before this call `head.next` is null;
  /// after, `begin()`/`end()` are well-defined even for an empty list.
  pub fn init(&mut self) {
    self.head.next = &mut self.tail;
    self.head.prev = ptr::null_mut();
    self.tail.prev = &mut self.head;
    self.tail.next = ptr::null_mut();
  }

  /// Whether `init` has run on this list yet (used by the allocator's
  /// lazy-init check: "is `segList[0]` initialized?").
  pub fn is_initialized(&self) -> bool {
    !self.head.next.is_null()
  }

  pub fn empty(&self) -> bool {
    debug_assert!(self.is_initialized());
    ptr::eq(self.head.next, &self.tail)
  }

  /// One-past-the-front sentinel. Iterate with `next` until `e == end()`.
  pub fn begin(&self) -> *mut ListElem {
    self.head.next
  }

  /// The sentinel that terminates iteration.
  pub fn end(&self) -> *mut ListElem {
    &self.tail as *const ListElem as *mut ListElem
  }

  /// # Safety
  /// `e` must be a live node currently in some list (this one or another).
  pub unsafe fn next(e: *mut ListElem) -> *mut ListElem {
    unsafe { (*e).next }
  }

  pub fn push_front(&mut self, e: *mut ListElem) {
    self.insert_before(self.head.next, e);
  }

  /// Inserts `e` immediately before `pos` (which may be `end()` to append).
  ///
  /// # Safety
  /// `pos` must be a live node in this list (including the sentinels).
  pub fn insert_before(&mut self, pos: *mut ListElem, e: *mut ListElem) {
    unsafe {
      (*e).prev = (*pos).prev;
      (*e).next = pos;
      (*(*pos).prev).next = e;
      (*pos).prev = e;
    }
  }

  /// Unlinks `e` from whichever list it is currently in, in O(1).
  ///
  /// # Safety
  /// `e` must currently be linked into a list (not a sentinel, not
  /// already removed).
  pub fn remove(e: *mut ListElem) {
    unsafe {
      (*(*e).prev).next = (*e).next;
      (*(*e).next).prev = (*e).prev;
    }
  }
}

impl Default for List {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn elem() -> Box<ListElem> {
    Box::new(ListElem::new())
  }

  #[test]
  fn uninitialized_list_reports_not_initialized() {
    let list = List::new();
    assert!(!list.is_initialized());
  }

  #[test]
  fn init_makes_list_empty() {
    let mut list = List::new();
    list.init();
    assert!(list.is_initialized());
    assert!(list.empty());
    assert_eq!(list.begin(), list.end());
  }

  #[test]
  fn push_front_and_iterate() {
    let mut list = List::new();
    list.init();

    let mut a = elem();
    let mut b = elem();
    list.push_front(a.as_mut());
    list.push_front(b.as_mut());

    // b was pushed last, so it's now at the front.
    let mut seen = Vec::new();
    let mut cur = list.begin();
    while cur != list.end() {
      seen.push(cur);
      cur = unsafe { List::next(cur) };
    }
    assert_eq!(seen, vec![b.as_mut() as *mut ListElem, a.as_mut() as *mut ListElem]);
  }

  #[test]
  fn remove_unlinks_without_disturbing_neighbors() {
    let mut list = List::new();
    list.init();

    let mut a = elem();
    let mut b = elem();
    let mut c = elem();
    list.push_front(c.as_mut());
    list.push_front(b.as_mut());
    list.push_front(a.as_mut());

    List::remove(b.as_mut());

    let mut seen = Vec::new();
    let mut cur = list.begin();
    while cur != list.end() {
      seen.push(cur);
      cur = unsafe { List::next(cur) };
    }
    assert_eq!(seen, vec![a.as_mut() as *mut ListElem, c.as_mut() as *mut ListElem]);
  }

  #[test]
  fn insert_before_end_appends() {
    let mut list = List::new();
    list.init();

    let mut a = elem();
    let mut b = elem();
    list.push_front(a.as_mut());
    list.insert_before(list.end(), b.as_mut());

    let mut seen = Vec::new();
    let mut cur = list.begin();
    while cur != list.end() {
      seen.push(cur);
      cur = unsafe { List::next(cur) };
    }
    assert_eq!(seen, vec![a.as_mut() as *mut ListElem, b.as_mut() as *mut ListElem]);
  }
}
