use super::{position, search_range};
use crate::error::Result;
use crate::frame::{Frame, Library};

pub const FUNCTIONS: Library = &[
    ("ArrayContains", contains),
    ("ArrayIndexOf", index_of),
    ("ArrayLastIndexOf", last_index_of),
];

fn contains(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(3)?;
    let items = frame.get_array(1)?;
    let found = items.contains(frame.get(2)?);
    frame.set_result(found);
    Ok(())
}

/// `ArrayIndexOf(arr, value [, start [, count]])`
fn index_of(frame: &mut Frame<'_>) -> Result<()> {
    let items = frame.get_array(1)?;
    let mut window = search_range(frame, items.len())?;
    let target = frame.get(2)?;
    let found = window.find(|&i| items[i] == *target);
    frame.set_result(position(found));
    Ok(())
}

/// `ArrayLastIndexOf(arr, value [, start [, count]])`
fn last_index_of(frame: &mut Frame<'_>) -> Result<()> {
    let items = frame.get_array(1)?;
    let window = search_range(frame, items.len())?;
    let target = frame.get(2)?;
    let found = window.rev().find(|&i| items[i] == *target);
    frame.set_result(position(found));
    Ok(())
}
