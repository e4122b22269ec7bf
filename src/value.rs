//! Dynamically typed script values and the coercions operators apply to them.

use crate::error::{Result, ScriptError};
use std::fmt;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Array(Vec<Value>),
}

impl Value {
    /// Collapses a whole-valued double into an integer. Applied whenever a
    /// value crosses an evaluation boundary.
    pub fn normalized(self) -> Value {
        match self {
            Value::Double(d) => Value::from_f64(d),
            other => other,
        }
    }

    pub fn from_f64(d: f64) -> Value {
        if d.is_finite() && d.fract() == 0.0 && d >= i64::MIN as f64 && d < i64::MAX as f64 {
            Value::Int(d as i64)
        } else {
            Value::Double(d)
        }
    }

    pub fn from_u64(n: u64) -> Value {
        match i64::try_from(n) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Double(n as f64),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    fn conversion(&self, expected: &'static str) -> ScriptError {
        ScriptError::Conversion {
            found: self.type_name(),
            expected,
        }
    }

    pub fn to_f64(&self) -> Result<f64> {
        match self {
            Value::Null => Ok(0.0),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Int(i) => Ok(*i as f64),
            Value::Double(d) => Ok(*d),
            Value::Str(s) => s.trim().parse::<f64>().map_err(|_| self.conversion("double")),
            Value::Array(_) => Err(self.conversion("double")),
        }
    }

    /// Integer conversion; fractional doubles round half to even.
    pub fn to_i64(&self) -> Result<i64> {
        match self {
            Value::Null => Ok(0),
            Value::Bool(b) => Ok(*b as i64),
            Value::Int(i) => Ok(*i),
            Value::Double(d) => {
                let rounded = d.round_ties_even();
                if rounded.is_finite() && rounded >= i64::MIN as f64 && rounded < i64::MAX as f64 {
                    Ok(rounded as i64)
                } else {
                    Err(self.conversion("integer"))
                }
            }
            Value::Str(s) => {
                let s = s.trim();
                match s.parse::<i64>() {
                    Ok(i) => Ok(i),
                    Err(_) => Value::Double(s.parse().map_err(|_| self.conversion("integer"))?).to_i64(),
                }
            }
            Value::Array(_) => Err(self.conversion("integer")),
        }
    }

    pub fn to_u64(&self) -> Result<u64> {
        let i = self.to_i64()?;
        u64::try_from(i).map_err(|_| self.conversion("unsigned integer"))
    }

    pub fn to_bool(&self) -> Result<bool> {
        match self {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Double(d) => Ok(*d != 0.0),
            Value::Str(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("true") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("false") {
                    Ok(false)
                } else {
                    Err(self.conversion("boolean"))
                }
            }
            Value::Array(_) => Err(self.conversion("boolean")),
        }
    }

    /// Text used when a value joins a string operation. Strings nested inside
    /// arrays are quoted and escaped; a top-level string is used as-is.
    pub fn to_text(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Equality used for `SELECT` keys: numbers compare numerically, strings exactly.
    pub fn key_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Str(_), _) | (_, Value::Str(_)) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.key_eq(y))
            }
            (Value::Null, Value::Null) => true,
            (a @ (Value::Int(_) | Value::Double(_)), b @ (Value::Int(_) | Value::Double(_))) => {
                matches!((a.to_f64(), b.to_f64()), (Ok(x), Ok(y)) if x == y)
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.key_eq(other)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::from_f64(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Double(d) => write!(f, "{}", d),
            Value::Str(s) => write!(f, "{}", s),
            Value::Array(items) => {
                write!(f, "{{ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Value::Str(s) => write!(f, "\"{}\"", escape(s))?,
                        other => write!(f, "{}", other)?,
                    }
                }
                if !items.is_empty() {
                    write!(f, " ")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Re-encodes control characters and quotes with backslash escapes.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Decodes the body of a quoted literal (quotes already stripped).
pub fn unescape(body: &str) -> Result<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| ScriptError::InvalidEscape(format!("u{}", hex)))?;
                out.push(decoded);
            }
            Some(other) => return Err(ScriptError::InvalidEscape(other.to_string())),
            None => return Err(ScriptError::InvalidEscape(String::new())),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whole_doubles_collapse_to_integers() {
        assert!(matches!(Value::Double(4.0).normalized(), Value::Int(4)));
        assert!(matches!(Value::Double(4.5).normalized(), Value::Double(d) if d == 4.5));
        assert!(Value::Null.normalized().is_null());
    }

    #[test]
    fn string_coercions() {
        assert_eq!(Value::from(" 12.5 ").to_f64().unwrap(), 12.5);
        assert_eq!(Value::from("TRUE").to_bool().unwrap(), true);
        assert!(Value::from("abc").to_f64().is_err());
        assert_eq!(Value::from(2.5).to_i64().unwrap(), 2);
        assert_eq!(Value::from(3.5).to_i64().unwrap(), 4);
        assert!(Value::from(-1).to_u64().is_err());
    }

    #[test]
    fn escapes_decode() {
        assert_eq!(unescape(r#"a\tb\n\"c\" A"#).unwrap(), "a\tb\n\"c\" A");
        assert!(matches!(unescape(r"\q"), Err(ScriptError::InvalidEscape(_))));
        assert!(unescape(r"\u00").is_err());
    }

    #[test]
    fn arrays_display_with_quoted_strings() {
        let arr = Value::Array(vec![Value::Int(1), Value::from("a\"b"), Value::Null]);
        assert_eq!(arr.to_string(), r#"{ 1, "a\"b",  }"#);
        assert_eq!(Value::Array(vec![]).to_string(), "{ }");
    }

    #[test]
    fn select_keys_compare_numbers_numerically() {
        assert!(Value::Int(2).key_eq(&Value::Double(2.0)));
        assert!(!Value::Int(2).key_eq(&Value::from("2")));
        assert!(!Value::from("a").key_eq(&Value::from("A")));
    }
}
