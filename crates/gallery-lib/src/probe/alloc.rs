//! Counting global allocator
//!
//! Install in a binary to give the probe real heap figures:
//!
//! ```rust,ignore
//! use gallery_lib::probe::CountingAllocator;
//!
//! #[global_allocator]
//! static GLOBAL: CountingAllocator = CountingAllocator::new();
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Allocations at or above this size are reported as large buffers
pub const LARGE_ALLOCATION_BYTES: usize = 64 * 1024;

static INSTALLED: AtomicBool = AtomicBool::new(false);
static LIVE_BYTES: AtomicU64 = AtomicU64::new(0);
static PEAK_BYTES: AtomicU64 = AtomicU64::new(0);
static LARGE_BYTES: AtomicU64 = AtomicU64::new(0);

/// Heap accounting as seen by the counting allocator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    pub live_bytes: u64,
    pub peak_bytes: u64,
    pub large_bytes: u64,
}

/// Wraps the system allocator and tracks live heap bytes
pub struct CountingAllocator;

impl CountingAllocator {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        Self::new()
    }
}

fn record_alloc(size: usize) {
    INSTALLED.store(true, Ordering::Relaxed);
    let size = size as u64;
    let live = LIVE_BYTES.fetch_add(size, Ordering::Relaxed) + size;
    PEAK_BYTES.fetch_max(live, Ordering::Relaxed);
    if size >= LARGE_ALLOCATION_BYTES as u64 {
        LARGE_BYTES.fetch_add(size, Ordering::Relaxed);
    }
}

fn record_dealloc(size: usize) {
    let size = size as u64;
    LIVE_BYTES.fetch_sub(size, Ordering::Relaxed);
    if size >= LARGE_ALLOCATION_BYTES as u64 {
        LARGE_BYTES.fetch_sub(size, Ordering::Relaxed);
    }
}

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = System.alloc_zeroed(layout);
        if !ptr.is_null() {
            record_alloc(layout.size());
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout);
        record_dealloc(layout.size());
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = System.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            record_dealloc(layout.size());
            record_alloc(new_size);
        }
        new_ptr
    }
}

/// Current heap accounting, or `None` when the allocator is not installed
pub fn allocator_stats() -> Option<AllocatorStats> {
    if !INSTALLED.load(Ordering::Relaxed) {
        return None;
    }

    Some(AllocatorStats {
        live_bytes: LIVE_BYTES.load(Ordering::Relaxed),
        peak_bytes: PEAK_BYTES.load(Ordering::Relaxed),
        large_bytes: LARGE_BYTES.load(Ordering::Relaxed),
    })
}
