//! The invocation frame shared by builtin commands, builtin functions and
//! user-defined functions.
//!
//! Argument 0 is always the callee name, so user-visible argument `n` lives at
//! index `n`. Commands get their arguments from the raw statement text; function
//! calls inside expressions get them already evaluated.

use crate::blocks::FuncBlock;
use crate::context::ContextRef;
use crate::error::{Result, ScriptError};
use crate::executer::Executer;
use crate::value::{unescape, Value};
use std::rc::Rc;

/// Signature of every builtin command and function.
pub type BuiltinFn = fn(&mut Frame<'_>) -> Result<()>;

/// A named table of builtins, merged into the global context at startup.
pub type Library = &'static [(&'static str, BuiltinFn)];

#[derive(Clone)]
pub enum Callable {
    Builtin(BuiltinFn),
    User(Rc<FuncBlock>),
}

impl Callable {
    pub fn invoke(&self, frame: &mut Frame<'_>) -> Result<()> {
        match self {
            Callable::Builtin(func) => func(frame),
            Callable::User(func) => func.call(frame),
        }
    }
}

pub struct Frame<'a> {
    exec: &'a mut Executer,
    args: Vec<Value>,
    text: String,
    pub result: Value,
    pub status: i32,
}

impl<'a> Frame<'a> {
    /// Builds a frame from a command-shaped line.
    pub fn from_text(exec: &'a mut Executer, text: &str) -> Result<Self> {
        let args = split_arguments(text)?.into_iter().map(Value::Str).collect();
        Ok(Frame {
            exec,
            args,
            text: text.trim().to_string(),
            result: Value::Null,
            status: 0,
        })
    }

    /// Builds a frame from a callee name and evaluated arguments.
    pub fn from_args(exec: &'a mut Executer, name: &str, values: Vec<Value>) -> Self {
        let mut args = Vec::with_capacity(values.len() + 1);
        args.push(Value::from(name));
        args.extend(values);
        Frame {
            exec,
            args,
            text: name.to_string(),
            result: Value::Null,
            status: 0,
        }
    }

    pub fn name(&self) -> String {
        self.args.first().map(Value::to_text).unwrap_or_default()
    }

    /// Number of entries including the name slot.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Raw text after the callee name.
    pub fn rest(&self) -> &str {
        let name_len = self.text.find(char::is_whitespace).unwrap_or(self.text.len());
        self.text[name_len..].trim()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn executer(&mut self) -> &mut Executer {
        &mut *self.exec
    }

    pub fn context(&self) -> ContextRef {
        self.exec.context()
    }

    /// Fails unless exactly `count` entries (name included) were supplied.
    pub fn assert_args(&self, count: usize) -> Result<()> {
        if self.args.len() == count {
            Ok(())
        } else {
            Err(self.count_error())
        }
    }

    /// Fails unless the entry count (name included) lies in `min..=max`.
    pub fn assert_args_between(&self, min: usize, max: usize) -> Result<()> {
        if (min..=max).contains(&self.args.len()) {
            Ok(())
        } else {
            Err(self.count_error())
        }
    }

    fn count_error(&self) -> ScriptError {
        ScriptError::ArgumentCount {
            name: self.name().to_uppercase(),
            count: self.args.len().saturating_sub(1),
        }
    }

    pub fn get(&self, index: usize) -> Result<&Value> {
        self.args.get(index).ok_or_else(|| self.count_error())
    }

    fn cast<T>(&self, index: usize, expected: &'static str, f: impl FnOnce(&Value) -> Result<T>) -> Result<T> {
        f(self.get(index)?).map_err(|_| ScriptError::InvalidCast { index, expected })
    }

    pub fn get_str(&self, index: usize) -> Result<String> {
        self.cast(index, "string", |v| match v {
            Value::Array(_) => Err(ScriptError::Argument(String::new())),
            other => Ok(other.to_text()),
        })
    }

    pub fn get_int(&self, index: usize) -> Result<i64> {
        self.cast(index, "integer", Value::to_i64)
    }

    pub fn get_f64(&self, index: usize) -> Result<f64> {
        self.cast(index, "double", Value::to_f64)
    }

    pub fn get_bool(&self, index: usize) -> Result<bool> {
        self.cast(index, "boolean", Value::to_bool)
    }

    pub fn get_array(&self, index: usize) -> Result<Vec<Value>> {
        self.cast(index, "array", |v| match v {
            Value::Array(items) => Ok(items.clone()),
            _ => Err(ScriptError::Argument(String::new())),
        })
    }

    /// An index argument bounded by `0..len`.
    pub fn get_index(&self, index: usize, len: usize) -> Result<usize> {
        let n = self.get_int(index)?;
        usize::try_from(n)
            .ok()
            .filter(|n| *n <= len)
            .ok_or_else(|| ScriptError::Argument(format!("parameter {} must be between 0 and {}", index, len)))
    }

    pub fn set_result(&mut self, value: impl Into<Value>) {
        self.result = value.into();
    }
}

/// Whitespace-separated arguments. Quoted sections are decoded and joined to
/// the surrounding word; an empty quoted string stands alone.
pub fn split_arguments(text: &str) -> Result<Vec<String>> {
    let mut args = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = text.trim().char_indices();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '"' | '\'' => {
                let mut body = String::new();
                let mut closed = false;
                while let Some((_, next)) = chars.next() {
                    if next == '\\' {
                        body.push(next);
                        if let Some((_, escaped)) = chars.next() {
                            body.push(escaped);
                        }
                    } else if next == c {
                        closed = true;
                        break;
                    } else {
                        body.push(next);
                    }
                }
                if !closed {
                    return Err(ScriptError::UnterminatedString(text.trim()[start..].to_string()));
                }
                let decoded = unescape(&body)?;
                if decoded.is_empty() && !in_word {
                    args.push(decoded);
                } else {
                    word.push_str(&decoded);
                    in_word = true;
                }
            }
            c => {
                word.push(c);
                in_word = true;
            }
        }
    }
    if in_word {
        args.push(word);
    }
    Ok(args)
}
