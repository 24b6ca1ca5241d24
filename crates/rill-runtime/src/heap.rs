//! Heap diagnostics.
//!
//! The checked allocator reports every block transition here: a concurrent
//! map of live blocks keyed by base address, plus running counters. Host
//! tooling can ask a compiled program how much of the runtime heap is still
//! live, and the test suite uses the same counters to prove that reference
//! counting frees each block exactly once, without ever touching freed
//! memory.
//!
//! The map must be concurrent even though compiled Rill programs are
//! single-threaded: the Rust test harness is not.

use std::sync::{
    LazyLock,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;

/// Live blocks: base address -> size in bytes.
static LIVE: LazyLock<DashMap<usize, u64>> = LazyLock::new(DashMap::new);

static ALLOCATED: AtomicU64 = AtomicU64::new(0);
static FREED: AtomicU64 = AtomicU64::new(0);
static PEAK: AtomicU64 = AtomicU64::new(0);

/// Snapshot of the allocation counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Blocks allocated since process start.
    pub allocated: u64,
    /// Blocks freed since process start.
    pub freed: u64,
    /// Blocks currently live.
    pub live: u64,
    /// Highest live-block count observed.
    pub peak: u64,
}

pub(crate) fn record_alloc(addr: usize, size: u64) {
    LIVE.insert(addr, size);
    let allocated = ALLOCATED.fetch_add(1, Ordering::Relaxed) + 1;
    let live = allocated.saturating_sub(FREED.load(Ordering::Relaxed));
    PEAK.fetch_max(live, Ordering::Relaxed);
}

pub(crate) fn record_realloc(old_addr: usize, new_addr: usize, new_size: u64) {
    // The block keeps its identity across a move; counters are unchanged.
    LIVE.remove(&old_addr);
    LIVE.insert(new_addr, new_size);
}

pub(crate) fn record_dealloc(addr: usize) {
    LIVE.remove(&addr);
    FREED.fetch_add(1, Ordering::Relaxed);
}

/// Number of currently live runtime allocations.
pub fn live_blocks() -> u64 {
    LIVE.len() as u64
}

/// Snapshot the allocation counters.
pub fn stats() -> HeapStats {
    let allocated = ALLOCATED.load(Ordering::Relaxed);
    let freed = FREED.load(Ordering::Relaxed);
    HeapStats {
        allocated,
        freed,
        live: allocated.saturating_sub(freed),
        peak: PEAK.load(Ordering::Relaxed),
    }
}

/// Number of currently live runtime allocations, for host tooling.
///
/// Internal symbol: not part of the public runtime API.
#[unsafe(no_mangle)]
pub extern "C" fn __rill_heap_live_blocks() -> u64 {
    live_blocks()
}

/// Write the allocation counters into the given slots, for host tooling.
/// Null slots are skipped.
///
/// Internal symbol: not part of the public runtime API.
///
/// # Safety
///
/// Each non-null pointer must be valid for a `u64` write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __rill_heap_stats(
    out_allocated: *mut u64,
    out_freed: *mut u64,
    out_peak: *mut u64,
) {
    let snapshot = stats();
    unsafe {
        if !out_allocated.is_null() {
            out_allocated.write(snapshot.allocated);
        }
        if !out_freed.is_null() {
            out_freed.write(snapshot.freed);
        }
        if !out_peak.is_null() {
            out_peak.write(snapshot.peak);
        }
    }
}
