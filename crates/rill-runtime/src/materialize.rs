//! Generator-driven array materialization.
//!
//! Drives a producer to exhaustion through its resume/finalize hooks and
//! publishes the collected values as a fresh reference-counted array. The
//! in-progress buffer is owned exclusively by the engine: growth may move
//! it, and nothing outside this module sees it until the exact-sized result
//! is returned with `ref_count = 1`.

use std::ptr::NonNull;

use crate::alloc::{checked_alloc, checked_realloc};
use crate::array::{RillArray, WORD_SIZE};
use crate::generator::{RillFinalizeFn, RillResumeFn, STATE_DONE};

/// Initial buffer capacity, in elements. Doubled on overflow.
const INITIAL_CAPACITY: usize = 4;

/// Collect a generator's full sequence into a fresh array.
///
/// # Safety
///
/// `resume` and `finalize` must be the hooks of the producer that created
/// `id`, and the generator must never have been resumed. Allocation failure
/// during growth aborts the process; no partial array is ever observable.
pub(crate) unsafe fn materialize(
    resume: RillResumeFn,
    finalize: RillFinalizeFn,
    id: u64,
) -> NonNull<RillArray> {
    let mut capacity = INITIAL_CAPACITY;
    let mut buf = checked_alloc(capacity * WORD_SIZE).cast::<i64>();
    let mut len = 0usize;
    let mut state = 0u64;

    loop {
        let step = unsafe { resume(id, state) };
        if step.state == STATE_DONE {
            break;
        }
        if len == capacity {
            let grown = capacity * 2;
            buf = unsafe { checked_realloc(buf.cast(), capacity * WORD_SIZE, grown * WORD_SIZE) }
                .cast();
            capacity = grown;
        }
        unsafe { buf.as_ptr().add(len).write(step.value) };
        len += 1;
        state = step.state;
    }

    unsafe { finalize(id) };

    // Publish at exact size: downstream code has no capacity field, so
    // `length` must be the whole truth about the allocation.
    let exact =
        unsafe { checked_realloc(buf.cast(), capacity * WORD_SIZE, len * WORD_SIZE) }.cast();
    unsafe { RillArray::from_raw_parts(exact, len as u64) }
}

/// Materialize the generator identified by `id` into a fresh array with
/// `ref_count = 1`.
///
/// Internal symbol: emitted by the compiler, not part of the public runtime
/// API.
///
/// # Safety
///
/// Same contract as [`materialize`]. Single-threaded callers only.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __rill_array_materialize(
    resume_fn: RillResumeFn,
    finalize_fn: RillFinalizeFn,
    id: u64,
) -> *mut RillArray {
    unsafe { materialize(resume_fn, finalize_fn, id) }.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::__rill_array_release;
    use crate::generator::{
        RillResume, __rill_range_finalize, __rill_range_init, __rill_range_resume,
    };
    use crate::heap;
    use serial_test::serial;
    use std::sync::atomic::{AtomicU64, Ordering};

    unsafe fn materialize_range(max: u64) -> *mut RillArray {
        let id = __rill_range_init(max);
        unsafe { __rill_array_materialize(__rill_range_resume, __rill_range_finalize, id) }
    }

    #[test]
    #[serial]
    fn range_materializes_in_order() {
        unsafe {
            let arr = materialize_range(10);
            assert_eq!((*arr).ref_count, 1);
            assert_eq!((*arr).length, 10);
            assert_eq!((*arr).as_slice(), &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
            __rill_array_release(arr, 1);
        }
    }

    #[test]
    #[serial]
    fn empty_range_materializes_to_length_zero() {
        let baseline = heap::live_blocks();
        unsafe {
            let arr = materialize_range(0);
            assert_eq!((*arr).length, 0);
            __rill_array_release(arr, 1);
        }
        assert_eq!(heap::live_blocks(), baseline);
    }

    #[test]
    #[serial]
    fn growth_boundary_loses_nothing() {
        // Five values cross the capacity-4 boundary exactly once.
        unsafe {
            let arr = materialize_range(5);
            assert_eq!((*arr).length, 5);
            assert_eq!((*arr).as_slice(), &[0, 1, 2, 3, 4]);
            __rill_array_release(arr, 1);
        }
    }

    #[test]
    #[serial]
    fn rematerialized_arrays_are_independent() {
        unsafe {
            let a = materialize_range(6);
            let b = materialize_range(6);
            assert_eq!((*a).as_slice(), (*b).as_slice());
            assert_ne!((*a).data, (*b).data);

            // Mutating one must not show through the other.
            (*a).data.write(99);
            assert_eq!((*b).as_slice()[0], 0);

            __rill_array_release(a, 1);
            __rill_array_release(b, 1);
        }
    }

    static FINALIZE_CALLS: AtomicU64 = AtomicU64::new(0);

    extern "C" fn counting_resume(id: u64, state: u64) -> RillResume {
        __rill_range_resume(id, state)
    }

    extern "C" fn counting_finalize(_id: u64) {
        FINALIZE_CALLS.fetch_add(1, Ordering::SeqCst);
    }

    #[test]
    #[serial]
    fn finalize_runs_exactly_once() {
        FINALIZE_CALLS.store(0, Ordering::SeqCst);
        unsafe {
            let arr = __rill_array_materialize(counting_resume, counting_finalize, 9);
            assert_eq!(FINALIZE_CALLS.load(Ordering::SeqCst), 1);
            __rill_array_release(arr, 1);
        }
    }

    // A producer with the Input generator's shape, reading from an
    // in-memory stream instead of process stdin.
    static PIPED: std::sync::Mutex<Option<std::io::Cursor<&'static [u8]>>> =
        std::sync::Mutex::new(None);

    extern "C" fn piped_resume(_id: u64, _state: u64) -> RillResume {
        let mut source = PIPED.lock().unwrap();
        crate::generator::input_resume_from(source.as_mut().unwrap())
    }

    extern "C" fn piped_finalize(_id: u64) {}

    #[test]
    #[serial]
    fn piped_input_materializes_every_value() {
        *PIPED.lock().unwrap() = Some(std::io::Cursor::new(&b"5 -6 7\n8"[..]));
        unsafe {
            let arr = __rill_array_materialize(piped_resume, piped_finalize, 0);
            assert_eq!((*arr).length, 4);
            assert_eq!((*arr).as_slice(), &[5, -6, 7, 8]);
            __rill_array_release(arr, 1);
        }
    }

    #[test]
    #[serial]
    fn piped_empty_input_materializes_to_length_zero() {
        *PIPED.lock().unwrap() = Some(std::io::Cursor::new(&b""[..]));
        unsafe {
            let arr = __rill_array_materialize(piped_resume, piped_finalize, 0);
            assert_eq!((*arr).length, 0);
            __rill_array_release(arr, 1);
        }
    }

    #[test]
    #[serial]
    fn large_range_survives_many_growth_rounds() {
        let baseline = heap::live_blocks();
        unsafe {
            let arr = materialize_range(1000);
            assert_eq!((*arr).length, 1000);
            let elements = (*arr).as_slice();
            for (i, &v) in elements.iter().enumerate() {
                assert_eq!(v, i as i64);
            }
            __rill_array_release(arr, 1);
        }
        assert_eq!(heap::live_blocks(), baseline);
    }
}
