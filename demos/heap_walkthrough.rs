use std::io::Read;

use rallocator::{Heap, print_break};

/// Waits until the user presses ENTER. Useful for inspecting memory state
/// with tools like `pmap`, `htop`, or `gdb` between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() {
  env_logger::init();

  // `Heap` must stay pinned once initialized, so it lives behind a `Box`.
  let mut heap = Box::new(Heap::default());

  print_break("start");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Allocate 8 bytes and write through the returned pointer.
  // --------------------------------------------------------------------
  let first = heap.malloc(8) as *mut u64;
  println!("\n[1] malloc(8) -> {:?}", first);
  unsafe {
    first.write(0xDEADBEEF);
    println!("[1] value written = 0x{:X}", first.read());
  }
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Allocate 100 bytes, fill it, then grow it with realloc.
  // --------------------------------------------------------------------
  let second = heap.malloc(100);
  println!("\n[2] malloc(100) -> {:?}", second);
  unsafe {
    std::ptr::write_bytes(second, 0xAB, 100);
  }

  let grown = heap.realloc(second, 200);
  println!("[2] realloc(second, 200) -> {:?}", grown);
  unsafe {
    assert!((0..100).all(|i| *grown.add(i) == 0xAB));
  }
  println!("[2] first 100 bytes survived the grow");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Free the first block, then allocate something small to see if
  //    the allocator reuses it instead of extending the heap again.
  // --------------------------------------------------------------------
  heap.free(first as *mut u8);
  println!("\n[3] freed first block at {:?}", first);

  let reused = heap.malloc(8);
  println!(
    "[3] malloc(8) again -> {:?} ({})",
    reused,
    if reused as *mut u64 == first { "reused the freed block" } else { "went elsewhere" }
  );
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Allocate something large enough to force a second heap extension.
  // --------------------------------------------------------------------
  print_break("before large alloc");
  let big = heap.malloc(64 * 1024);
  println!("\n[4] malloc(64 KiB) -> {:?}", big);
  print_break("after large alloc");

  println!("\n[5] End of demo. The process exits and the OS reclaims everything.");
}
