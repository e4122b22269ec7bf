//! Statement commands: assignment, declarations, flow control and includes.

use crate::error::{Result, ScriptError};
use crate::evaluator::{evaluate, parse_variable};
use crate::frame::{Frame, Library};
use crate::value::Value;
use std::thread;
use std::time::Duration;

pub const COMMANDS: Library = &[
    ("#include", include),
    ("LET", let_statement),
    ("DIM", dim),
    ("CONST", constant),
    ("EXIT", exit),
    ("BREAK", brk),
    ("SLEEP", sleep),
    ("ELSE", no_opening),
    ("END", no_opening),
    ("WEND", no_opening),
    ("LOOP", no_opening),
    ("NEXT", no_opening),
    ("CASE", no_opening),
    ("DEFAULT", no_opening),
];

/// Splits `target = expr` at the first `=` outside brackets and quotes.
fn split_assignment(text: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            '=' if depth == 0 => return Some((text[..i].trim(), text[i + 1..].trim())),
            _ => {}
        }
    }
    None
}

fn assignment<'t>(frame: &'t Frame<'_>, command: &str) -> Result<(&'t str, &'t str)> {
    let (target, expr) = split_assignment(frame.rest())
        .ok_or_else(|| ScriptError::Argument(format!("{} expects 'name = value'", command)))?;
    if target.is_empty() {
        return Err(ScriptError::InvalidVariableName(String::new()));
    }
    if expr.is_empty() {
        return Err(ScriptError::InvalidExpression(format!("{} has no value", command)));
    }
    Ok((target, expr))
}

fn let_statement(frame: &mut Frame<'_>) -> Result<()> {
    let (target, expr) = assignment(frame, "LET")?;
    let (target, expr) = (parse_variable(target)?, expr.to_string());
    let exec = frame.executer();
    let value = evaluate(&expr, exec)?;
    target.write(exec, value)
}

fn dim(frame: &mut Frame<'_>) -> Result<()> {
    if split_assignment(frame.rest()).is_some() {
        let (target, expr) = assignment(frame, "DIM")?;
        let (target, expr) = (parse_variable(target)?, expr.to_string());
        if target.has_indices() {
            return Err(ScriptError::Argument("DIM cannot size and initialize an array at once".into()));
        }
        let exec = frame.executer();
        let value = evaluate(&expr, exec)?;
        return exec.context().declare_variable(target.name(), value);
    }

    if frame.rest().is_empty() {
        return Err(ScriptError::ArgumentCount {
            name: "DIM".into(),
            count: 0,
        });
    }
    let target = parse_variable(frame.rest())?;
    let exec = frame.executer();
    let context = exec.context();
    if !target.has_indices() {
        return context.declare_variable(target.name(), Value::Null);
    }

    let sizes = target.evaluate_indices(exec)?;
    let value = if context.declares_variable(target.name()) {
        let mut existing = context.get_variable(target.name())?;
        resize(&mut existing, &sizes);
        existing
    } else {
        allocate(&sizes)
    };
    tracing::trace!(name = target.name(), ?sizes, "array dimensioned");
    context.declare_variable(target.name(), value)
}

/// A nested array of nulls with the given dimensions.
fn allocate(sizes: &[usize]) -> Value {
    match sizes.split_first() {
        None => Value::Null,
        Some((&len, rest)) => Value::Array((0..len).map(|_| allocate(rest)).collect()),
    }
}

/// Resizes every level in place. Elements that survive keep their values and
/// scalars in the way of a deeper dimension are replaced by fresh arrays.
fn resize(value: &mut Value, sizes: &[usize]) {
    let Some((&len, rest)) = sizes.split_first() else {
        return;
    };
    match value {
        Value::Array(items) => {
            items.resize(len, Value::Null);
            if !rest.is_empty() {
                items.iter_mut().for_each(|item| resize(item, rest));
            }
        }
        other => *other = allocate(sizes),
    }
}

fn constant(frame: &mut Frame<'_>) -> Result<()> {
    let (target, expr) = assignment(frame, "CONST")?;
    let (target, expr) = (parse_variable(target)?, expr.to_string());
    if target.has_indices() {
        return Err(ScriptError::Argument("arrays cannot be declared as constants".into()));
    }
    let exec = frame.executer();
    let value = evaluate(&expr, exec)?;
    exec.context().set_constant(target.name(), value)
}

fn exit(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(1)?;
    frame.executer().request_exit();
    Ok(())
}

fn brk(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(1)?;
    frame.executer().request_break();
    Ok(())
}

fn sleep(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let ms = frame.get_int(1)?;
    let ms = u64::try_from(ms).map_err(|_| ScriptError::Argument("SLEEP takes a non-negative duration".into()))?;
    thread::sleep(Duration::from_millis(ms));
    Ok(())
}

fn include(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let path = frame.get_str(1)?;
    let value = frame.executer().include(&path)?;
    frame.set_result(value);
    Ok(())
}

fn no_opening(frame: &mut Frame<'_>) -> Result<()> {
    Err(ScriptError::NoOpeningStatement(frame.text().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executer::Executer;
    use pretty_assertions::assert_eq;

    #[test]
    fn assignment_splits_outside_brackets_and_quotes() {
        assert_eq!(split_assignment("x$ = 1"), Some(("x$", "1")));
        assert_eq!(split_assignment("a$[i$ = 1] = 2"), Some(("a$[i$ = 1]", "2")));
        assert_eq!(split_assignment(r#"s$ = "a = b""#), Some(("s$", r#""a = b""#)));
        assert_eq!(split_assignment("x$"), None);
    }

    #[test]
    fn allocate_builds_nested_nulls() {
        let value = allocate(&[2, 3]);
        let Value::Array(rows) = &value else {
            panic!("expected an array");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], Value::Array(vec![Value::Null; 3]));
    }

    #[test]
    fn resize_keeps_surviving_elements() {
        let mut value = Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        resize(&mut value, &[2]);
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2)]));
        resize(&mut value, &[3]);
        assert_eq!(value, Value::Array(vec![Value::Int(1), Value::Int(2), Value::Null]));
    }

    #[test]
    fn dim_forms() {
        let mut exec = Executer::new();
        exec.execute("DIM a$[2]\nDIM b$\nDIM c$ = 5\na$[1] = \"x\"").unwrap();
        let global = exec.global();
        assert_eq!(global.get_variable("a$").unwrap(), Value::Array(vec![Value::Null, Value::from("x")]));
        assert!(global.get_variable("b$").unwrap().is_null());
        assert_eq!(global.get_variable("c$").unwrap(), Value::Int(5));
    }

    #[test]
    fn dim_resizes_local_array() {
        let mut exec = Executer::new();
        exec.execute("DIM a$[2]\na$[0] = 7\nDIM a$[4]").unwrap();
        let value = exec.global().get_variable("a$").unwrap();
        assert_eq!(value, Value::Array(vec![Value::Int(7), Value::Null, Value::Null, Value::Null]));
    }

    #[test]
    fn const_is_write_once() {
        let mut exec = Executer::new();
        exec.execute("CONST @limit = 10").unwrap();
        let err = exec.execute("CONST @limit = 11").unwrap_err();
        assert!(matches!(err.root(), ScriptError::ConstantChange(_)));
    }

    #[test]
    fn let_requires_a_value() {
        let mut exec = Executer::new();
        let err = exec.execute("LET x$").unwrap_err();
        assert!(matches!(err.root(), ScriptError::Argument(_)));
        let err = exec.execute("LET x$ =").unwrap_err();
        assert!(matches!(err.root(), ScriptError::InvalidExpression(_)));
    }

    #[test]
    fn break_takes_no_arguments() {
        let mut exec = Executer::new();
        let err = exec.execute("BREAK now").unwrap_err();
        assert!(matches!(err.root(), ScriptError::ArgumentCount { .. }));
    }

    #[test]
    fn closing_keywords_outside_blocks() {
        let mut exec = Executer::new();
        for stray in ["NEXT", "LOOP", "CASE 1", "DEFAULT", "ELSE", "END IF"] {
            let err = exec.execute(stray).unwrap_err();
            assert!(matches!(err.root(), ScriptError::NoOpeningStatement(_)), "{}", stray);
        }
    }
}
