//! Error type shared by every stage of the interpreter.

use std::fmt::Write as _;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    // --- Parse errors ---
    #[error("line continuation character '_' cannot end script (line {line})")]
    EndOfCode { line: u32 },
    #[error("unterminated '{block}' block starting on line {line}")]
    UnterminatedBlock { line: u32, block: String },
    #[error("malformed {block} block: {reason}")]
    MalformedBlock { block: String, reason: String },
    #[error("malformed function declaration '{0}'")]
    MalformedFunction(String),
    #[error("functions cannot be declared inside other functions (line {line})")]
    NestedFunction { line: u32 },
    #[error("invalid expression: {0}")]
    InvalidExpression(String),
    #[error("invalid token in expression '{0}'")]
    InvalidToken(String),
    #[error("unterminated string {0}")]
    UnterminatedString(String),
    #[error("unrecognized escape sequence '\\{0}'")]
    InvalidEscape(String),
    #[error("'{0}' has no opening statement")]
    NoOpeningStatement(String),
    #[error("expected a condition")]
    NoCondition,

    // --- Type errors ---
    #[error("operator '{op}' cannot be applied to types {left} and {right}")]
    OperatorTypes {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
    #[error("operator '{op}' cannot be applied to type {operand}")]
    UnaryTypes { op: &'static str, operand: &'static str },
    #[error("expected parameter {index} to be of type {expected}")]
    InvalidCast { index: usize, expected: &'static str },
    #[error("value of type {found} cannot be converted to {expected}")]
    Conversion {
        found: &'static str,
        expected: &'static str,
    },
    #[error("division by zero")]
    DivideByZero,

    // --- Names and scopes ---
    #[error("'{0}' does not exist in the current context")]
    Undefined(String),
    #[error("'{0}' is a constant and cannot be changed")]
    ConstantChange(String),
    #[error("an object '{name}' has been defined as a {kind} and cannot be redefined as a {new_kind}")]
    AlreadyDefined {
        name: String,
        kind: &'static str,
        new_kind: &'static str,
    },
    #[error("the context has been cleared")]
    ContextCleared,
    #[error("'{0}' is not a valid variable name")]
    InvalidVariableName(String),

    // --- Calls and arguments ---
    #[error("{name} does not take {count} parameter{}", plural(.count))]
    ArgumentCount { name: String, count: usize },
    #[error("{0}")]
    Argument(String),
    #[error("maximum call depth of {0} exceeded")]
    RecursionLimit(usize),

    // --- Arrays ---
    #[error("index {index} is out of range for '{name}'")]
    IndexOutOfRange { name: String, index: i64 },
    #[error("'{0}' is not an array and cannot be indexed")]
    IndexUnavailable(String),
    #[error("no index was specified")]
    NoIndexSpecified,

    #[error("IO Error: {0}")]
    Io(#[from] io::Error),

    /// Wraps a failure with the script line it happened on.
    #[error("an error occurred at '{name}' on line {line}")]
    AtLine {
        line: u32,
        name: String,
        #[source]
        source: Box<ScriptError>,
    },
}

impl ScriptError {
    pub fn at_line(line: u32, name: impl Into<String>, source: ScriptError) -> Self {
        ScriptError::AtLine {
            line,
            name: name.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, with every line wrapper stripped.
    pub fn root(&self) -> &ScriptError {
        let mut current = self;
        while let ScriptError::AtLine { source, .. } = current {
            current = source;
        }
        current
    }

    /// Line number of the outermost wrapper, if any.
    pub fn line(&self) -> Option<u32> {
        match self {
            ScriptError::AtLine { line, .. } => Some(*line),
            ScriptError::EndOfCode { line }
            | ScriptError::UnterminatedBlock { line, .. }
            | ScriptError::NestedFunction { line } => Some(*line),
            _ => None,
        }
    }

    /// Renders the wrapper chain innermost-first followed by the detail message.
    pub fn report(&self) -> String {
        let mut frames = Vec::new();
        let mut current = self;
        while let ScriptError::AtLine { line, name, source } = current {
            frames.push((*line, name.as_str()));
            current = source;
        }
        let Some(&(line, name)) = frames.last() else {
            return current.to_string();
        };
        let mut out = format!("An error occurred at '{}' on line {}\n", name, line);
        for (line, name) in frames.iter().rev().skip(1) {
            let _ = writeln!(out, "\tat '{}' on line {}", name, line);
        }
        let _ = write!(out, "\nDetail:\n{}", current);
        out
    }
}

fn plural(count: &usize) -> &'static str {
    if *count == 1 {
        ""
    } else {
        "s"
    }
}

pub type Result<T, E = ScriptError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_innermost_frame_first() {
        let inner = ScriptError::at_line(4, "x$", ScriptError::DivideByZero);
        let outer = ScriptError::at_line(2, "WHILE", inner);

        let report = outer.report();
        assert!(report.starts_with("An error occurred at 'x$' on line 4\n"));
        assert!(report.contains("\tat 'WHILE' on line 2"));
        assert!(report.ends_with("Detail:\ndivision by zero"));
        assert!(matches!(outer.root(), ScriptError::DivideByZero));
        assert_eq!(outer.line(), Some(2));
    }

    #[test]
    fn argument_count_pluralizes() {
        let one = ScriptError::ArgumentCount { name: "ABS".into(), count: 1 };
        let two = ScriptError::ArgumentCount { name: "ABS".into(), count: 2 };
        assert_eq!(one.to_string(), "ABS does not take 1 parameter");
        assert_eq!(two.to_string(), "ABS does not take 2 parameters");
    }
}
