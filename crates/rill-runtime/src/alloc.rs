//! Checked heap allocation.
//!
//! Every block the runtime hands to generated code comes from here.
//! Out-of-memory is not a recoverable condition in Rill: the failure is
//! reported on stderr and the process aborts, so no caller ever branches on
//! a null result. Centralizing that policy keeps the array and
//! materialization paths free of failure handling.

use std::alloc::{self, Layout};
use std::process;
use std::ptr::NonNull;

use crate::heap;

/// Alignment of every runtime allocation (one 64-bit word).
pub(crate) const ALLOC_ALIGN: usize = 8;

/// Report an allocation failure and terminate the process.
pub(crate) fn fatal_oom(size: u64) -> ! {
    eprintln!("rill runtime: out of memory (requested {size} bytes)");
    process::abort()
}

fn layout_for(size: usize) -> Layout {
    // A layout failure means the requested size overflowed `isize`; treat it
    // the same as exhaustion.
    Layout::from_size_align(size, ALLOC_ALIGN).unwrap_or_else(|_| fatal_oom(size as u64))
}

/// Allocate `size` bytes, aborting the process on failure.
///
/// A zero-size request returns a well-aligned dangling pointer; it is never
/// dereferenced, and `checked_dealloc`/`checked_realloc` accept it back.
pub(crate) fn checked_alloc(size: usize) -> NonNull<u8> {
    if size == 0 {
        return NonNull::<u64>::dangling().cast();
    }
    let ptr = unsafe { alloc::alloc(layout_for(size)) };
    let Some(ptr) = NonNull::new(ptr) else {
        fatal_oom(size as u64);
    };
    heap::record_alloc(ptr.as_ptr() as usize, size as u64);
    ptr
}

/// Grow or shrink a block from `old_size` to `new_size` bytes, aborting the
/// process on failure. Shrinking to zero releases the block.
///
/// # Safety
///
/// `ptr` must have been returned by `checked_alloc` or `checked_realloc`
/// with exactly `old_size` bytes (or be the dangling zero-size pointer with
/// `old_size == 0`).
pub(crate) unsafe fn checked_realloc(
    ptr: NonNull<u8>,
    old_size: usize,
    new_size: usize,
) -> NonNull<u8> {
    if old_size == 0 {
        return checked_alloc(new_size);
    }
    if new_size == 0 {
        unsafe { checked_dealloc(ptr, old_size) };
        return NonNull::<u64>::dangling().cast();
    }
    let new_ptr = unsafe { alloc::realloc(ptr.as_ptr(), layout_for(old_size), new_size) };
    let Some(new_ptr) = NonNull::new(new_ptr) else {
        fatal_oom(new_size as u64);
    };
    heap::record_realloc(ptr.as_ptr() as usize, new_ptr.as_ptr() as usize, new_size as u64);
    new_ptr
}

/// Return a block to the system.
///
/// # Safety
///
/// Same provenance contract as `checked_realloc`.
pub(crate) unsafe fn checked_dealloc(ptr: NonNull<u8>, size: usize) {
    if size == 0 {
        return;
    }
    heap::record_dealloc(ptr.as_ptr() as usize);
    unsafe { alloc::dealloc(ptr.as_ptr(), layout_for(size)) };
}

/// Allocate `size` bytes for generated code.
///
/// Internal symbol: emitted by the compiler, not part of the public runtime
/// API. Never returns null; allocation failure aborts the process.
///
/// # Safety
///
/// The returned block must be released with the same size, either through
/// `__rill_realloc(ptr, size, 0)` or by one of the array release paths.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __rill_alloc(size: u64) -> *mut u8 {
    let Ok(size) = usize::try_from(size) else {
        fatal_oom(size);
    };
    checked_alloc(size).as_ptr()
}

/// Resize a block allocated by `__rill_alloc`/`__rill_realloc`.
///
/// Internal symbol: emitted by the compiler, not part of the public runtime
/// API. Never returns null on a non-zero request; a `new_size` of zero
/// releases the block and returns a dangling pointer.
///
/// # Safety
///
/// `ptr` must have been allocated by this runtime with exactly `old_size`
/// bytes, or be null with `old_size == 0` (in which case this allocates).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __rill_realloc(ptr: *mut u8, old_size: u64, new_size: u64) -> *mut u8 {
    let (Ok(old_size), Ok(new_size)) = (usize::try_from(old_size), usize::try_from(new_size))
    else {
        fatal_oom(new_size);
    };
    match NonNull::new(ptr) {
        Some(ptr) => unsafe { checked_realloc(ptr, old_size, new_size) }.as_ptr(),
        None => checked_alloc(new_size).as_ptr(),
    }
}
