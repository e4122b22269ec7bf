//! Builtin commands and function libraries.
//!
//! `statements` is installed into every executer. The rest are pure function
//! tables merged into the global context by [`install_standard`].

pub mod arrays;
pub mod console;
pub mod math;
pub mod runtime;
pub mod statements;
pub mod strings;

use crate::context::ContextRef;
use crate::error::Result;
use crate::frame::Frame;
use std::ops::Range;

/// Installs every function library and the math constants.
pub fn install_standard(global: &ContextRef) -> Result<()> {
    math::install(global)?;
    global.add_library(runtime::FUNCTIONS)?;
    global.add_library(strings::FUNCTIONS)?;
    global.add_library(arrays::FUNCTIONS)?;
    global.add_library(console::FUNCTIONS)?;
    tracing::debug!("standard library installed");
    Ok(())
}

/// Optional `start` and `count` arguments at positions 3 and 4 of a search
/// over `len` elements. Defaults cover the whole sequence.
pub(crate) fn search_range(frame: &Frame<'_>, len: usize) -> Result<Range<usize>> {
    frame.assert_args_between(3, 5)?;
    let start = if frame.len() > 3 { frame.get_index(3, len)? } else { 0 };
    let count = if frame.len() > 4 {
        frame.get_index(4, len - start)?
    } else {
        len - start
    };
    Ok(start..start + count)
}

/// Index result of a search, `-1` when nothing matched.
pub(crate) fn position(found: Option<usize>) -> i64 {
    found.and_then(|i| i64::try_from(i).ok()).unwrap_or(-1)
}
