//! Stack growth for the recursive passes.
//!
//! Parsing, resolution, printing and evaluation all recurse once per level of
//! syntactic nesting, and evaluation once more per Lox call.  Each recursive
//! entry point runs through [`ensure_sufficient_stack`] so deep programs grow
//! onto a fresh stack segment instead of overflowing the thread's stack.

/// Run `f`, first switching to a new stack segment if less than the red zone
/// remains on the current one.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Headroom below which a new segment is allocated (128KB).
    const RED_ZONE: usize = 128 * 1024;

    /// Size of each new segment (1MB).
    const SEGMENT_SIZE: usize = 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

/// wasm manages its own stack.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
