//! String functions. Positions and lengths count characters, not bytes.

use super::{position, search_range};
use crate::error::{Result, ScriptError};
use crate::frame::{Frame, Library};
use crate::value::Value;
use std::cmp::Ordering;

pub const FUNCTIONS: Library = &[
    ("StrContains", contains),
    ("StrIndexOf", index_of),
    ("StrLastIndexOf", last_index_of),
    ("StrUpper", upper),
    ("StrLower", lower),
    ("StrLeft", left),
    ("StrRight", right),
    ("StrTrim", trim),
    ("StrTrimStart", trim_start),
    ("StrTrimEnd", trim_end),
    ("StrSplit", split),
    ("StrCompare", compare),
    ("Substring", substring),
];

fn chars(frame: &Frame<'_>, index: usize) -> Result<Vec<char>> {
    Ok(frame.get_str(index)?.chars().collect())
}

/// Every start offset where `needle` occurs inside `window` of `haystack`.
fn occurrences<'h>(haystack: &'h [char], needle: &'h [char], window: std::ops::Range<usize>) -> impl Iterator<Item = usize> + 'h {
    let end = window.end;
    window
        .filter(move |&i| i + needle.len() <= end)
        .filter(move |&i| haystack[i..i + needle.len()] == *needle)
}

fn contains(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(3)?;
    let found = frame.get_str(1)?.contains(&frame.get_str(2)?);
    frame.set_result(found);
    Ok(())
}

/// `StrIndexOf(s, sub [, start [, count]])`
fn index_of(frame: &mut Frame<'_>) -> Result<()> {
    let (haystack, needle) = (chars(frame, 1)?, chars(frame, 2)?);
    let window = search_range(frame, haystack.len())?;
    let found = occurrences(&haystack, &needle, window).next();
    frame.set_result(position(found));
    Ok(())
}

/// `StrLastIndexOf(s, sub [, start [, count]])`
fn last_index_of(frame: &mut Frame<'_>) -> Result<()> {
    let (haystack, needle) = (chars(frame, 1)?, chars(frame, 2)?);
    let window = search_range(frame, haystack.len())?;
    let found = occurrences(&haystack, &needle, window).last();
    frame.set_result(position(found));
    Ok(())
}

fn map_text(frame: &mut Frame<'_>, f: fn(&str) -> String) -> Result<()> {
    frame.assert_args(2)?;
    let text = f(&frame.get_str(1)?);
    frame.set_result(text);
    Ok(())
}

fn upper(frame: &mut Frame<'_>) -> Result<()> {
    map_text(frame, str::to_uppercase)
}

fn lower(frame: &mut Frame<'_>) -> Result<()> {
    map_text(frame, str::to_lowercase)
}

fn trim(frame: &mut Frame<'_>) -> Result<()> {
    map_text(frame, |s| s.trim().to_string())
}

fn trim_start(frame: &mut Frame<'_>) -> Result<()> {
    map_text(frame, |s| s.trim_start().to_string())
}

fn trim_end(frame: &mut Frame<'_>) -> Result<()> {
    map_text(frame, |s| s.trim_end().to_string())
}

/// First `n` characters.
fn left(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(3)?;
    let text = chars(frame, 1)?;
    let n = frame.get_index(2, text.len())?;
    frame.set_result(text[..n].iter().collect::<String>());
    Ok(())
}

/// Last `n` characters.
fn right(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(3)?;
    let text = chars(frame, 1)?;
    let n = frame.get_index(2, text.len())?;
    frame.set_result(text[text.len() - n..].iter().collect::<String>());
    Ok(())
}

/// `Substring(s, start [, length])`
fn substring(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args_between(3, 4)?;
    let text = chars(frame, 1)?;
    let start = frame.get_index(2, text.len())?;
    let len = if frame.len() == 4 {
        frame.get_index(3, text.len() - start)?
    } else {
        text.len() - start
    };
    frame.set_result(text[start..start + len].iter().collect::<String>());
    Ok(())
}

fn split(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(3)?;
    let (text, separator) = (frame.get_str(1)?, frame.get_str(2)?);
    if separator.is_empty() {
        return Err(ScriptError::Argument("StrSplit needs a non-empty separator".into()));
    }
    let parts: Vec<Value> = text.split(separator.as_str()).map(Value::from).collect();
    frame.set_result(parts);
    Ok(())
}

/// Ordinal comparison: -1, 0 or 1.
fn compare(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(3)?;
    let ordering = frame.get_str(1)?.cmp(&frame.get_str(2)?);
    frame.set_result(match ordering {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    });
    Ok(())
}
