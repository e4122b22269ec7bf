//! Type inspection and conversion functions.

use crate::context::Resolved;
use crate::error::Result;
use crate::frame::{Frame, Library};
use crate::value::Value;

pub const FUNCTIONS: Library = &[
    ("Size", size),
    ("Len", size),
    ("IsStr", is_str),
    ("IsInt", is_int),
    ("IsDouble", is_double),
    ("IsBool", is_bool),
    ("IsDefined", is_defined),
    ("Str", to_str),
    ("Double", to_double),
    ("Int", to_int),
    ("Bool", to_bool),
];

/// Characters of a string, elements of an array, storage bytes of a scalar.
fn size(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let len = match frame.get(1)? {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Double(_) => 8,
        Value::Str(s) => s.chars().count(),
        Value::Array(items) => items.len(),
    };
    frame.set_result(Value::from_u64(len as u64));
    Ok(())
}

fn is_type(frame: &mut Frame<'_>, test: fn(&Value) -> bool) -> Result<()> {
    frame.assert_args(2)?;
    let matched = test(frame.get(1)?);
    frame.set_result(matched);
    Ok(())
}

fn is_str(frame: &mut Frame<'_>) -> Result<()> {
    is_type(frame, Value::is_str)
}

fn is_int(frame: &mut Frame<'_>) -> Result<()> {
    is_type(frame, |v| matches!(v, Value::Int(_)))
}

fn is_double(frame: &mut Frame<'_>) -> Result<()> {
    is_type(frame, |v| matches!(v, Value::Double(_)))
}

fn is_bool(frame: &mut Frame<'_>) -> Result<()> {
    is_type(frame, |v| matches!(v, Value::Bool(_)))
}

/// `IsDefined("name$")`: whether any kind of object has that name in scope.
fn is_defined(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let name = frame.get_str(1)?;
    let found = !matches!(frame.context().resolve(&name)?, Resolved::NotFound);
    frame.set_result(found);
    Ok(())
}

fn to_str(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let text = frame.get(1)?.to_text();
    frame.set_result(text);
    Ok(())
}

fn to_double(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let d = frame.get_f64(1)?;
    frame.set_result(Value::Double(d));
    Ok(())
}

fn to_int(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let i = frame.get_int(1)?;
    frame.set_result(i);
    Ok(())
}

fn to_bool(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let b = frame.get_bool(1)?;
    frame.set_result(b);
    Ok(())
}
