//! Rill runtime library.
//!
//! Provides the native runtime functions required by Rill's compiled output:
//! - Checked heap allocation (`__rill_alloc`, `__rill_realloc`)
//! - Reference-counted arrays (`__rill_array_new`, `__rill_array_fill`,
//!   `__rill_array_retain`, `__rill_array_release`)
//! - Generator producers and array materialization (`__rill_range_*`,
//!   `__rill_input_*`, `__rill_array_materialize`)
//! - Scalar I/O builtins (`rill_builtin_print_int64`, `rill_builtin_read_int64`)
//! - Heap diagnostics for host tooling (`__rill_heap_*`)
//!
//! Symbols prefixed `__rill_` are internal: the Rill compiler emits calls to
//! them, and they are not part of the public runtime API. Rill-authored code
//! reaches the runtime only through the `rill_builtin_*` surface.
//!
//! The runtime assumes single-threaded callers. Reference counts are plain
//! integers with no synchronization, which is sound under the language's
//! execution model (one thread, no shared generators, no concurrent resumes).

pub mod alloc;
pub mod array;
pub mod builtins;
pub mod generator;
pub mod heap;
pub mod materialize;
