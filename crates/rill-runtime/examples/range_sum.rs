//! What the compiled output of a tiny Rill program does with the runtime:
//!
//! ```text
//! let xs = [each i to 10]
//! print sum(xs)
//! ```
//!
//! Materialize the range generator, fold the resulting array, print with
//! the builtin, release.

use rill_runtime::array::__rill_array_release;
use rill_runtime::builtins::rill_builtin_print_int64;
use rill_runtime::generator::{__rill_range_finalize, __rill_range_init, __rill_range_resume};
use rill_runtime::materialize::__rill_array_materialize;

fn main() {
    unsafe {
        let id = __rill_range_init(10);
        let xs = __rill_array_materialize(__rill_range_resume, __rill_range_finalize, id);

        let sum: i64 = (*xs).as_slice().iter().sum();
        rill_builtin_print_int64(sum);

        __rill_array_release(xs, 1);
    }
}
