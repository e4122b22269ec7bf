//! Stack growth for recursive script execution.
//!
//! User functions, nested blocks and parenthesized groups all recurse on the
//! native stack. Call [`ensure_sufficient_stack`] at those points so that
//! `max_call_depth` is the only limit a script can hit, whatever the size of
//! the host thread's stack.

/// Space that must remain before the stack is grown.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
