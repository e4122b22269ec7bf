use super::parse_block;
use crate::error::{Result, ScriptError};
use crate::evaluator::evaluate;
use crate::frame::{Callable, Frame};
use crate::line::Line;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

/// Bookkeeping for one active user-function call.
#[derive(Debug, Default)]
pub struct CallRecord {
    pub result: Option<Value>,
    pub status: Option<i32>,
}

impl CallRecord {
    /// True once `return` has run in this call.
    pub fn returned(&self) -> bool {
        self.result.is_some()
    }
}

/// A user-defined `FUNCTION name(params) ... END FUNCTION`.
#[derive(Debug, Clone)]
pub struct FuncBlock {
    name: String,
    params: Vec<String>,
    header: Line,
    body: Vec<Line>,
    length: usize,
}

impl FuncBlock {
    pub fn parse(index: usize, lines: &[Line]) -> Result<FuncBlock> {
        let block = parse_block(index, lines, |l| l.name_is("FUNCTION"), |l| l.text_is("END FUNCTION"))?;
        let (name, params) = parse_template(block.header.rest())?;
        Ok(FuncBlock {
            name,
            params,
            length: block.length(),
            header: block.header,
            body: block.body,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn header(&self) -> &Line {
        &self.header
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Runs the body in a fresh scope with each parameter bound to its argument.
    pub fn call(&self, frame: &mut Frame<'_>) -> Result<()> {
        frame.assert_args(self.params.len() + 1)?;
        let args = frame.args()[1..].to_vec();
        let exec = frame.executer();

        let limit = exec.config().max_call_depth;
        if exec.call_depth() >= limit {
            return Err(ScriptError::RecursionLimit(limit));
        }

        let caller = exec.context();
        let scope = caller.create_function_child()?;
        for (param, arg) in self.params.iter().zip(args) {
            scope.declare_variable(param, arg)?;
        }
        scope.declare_command("return", Callable::Builtin(return_value))?;
        scope.declare_command("SetStatus", Callable::Builtin(set_status))?;
        scope.declare_function("SetStatus", Callable::Builtin(set_status))?;

        tracing::debug!(function = %self.name, depth = exec.call_depth() + 1, "calling function");
        exec.set_context(scope.clone());
        exec.push_call();
        let outcome = ensure_sufficient_stack(|| exec.execute_lines(&self.body));
        let record = exec.pop_call();
        exec.honor_break();
        exec.set_context(caller);
        scope.collect()?;

        let outcome = outcome?;
        frame.status = record.status.unwrap_or(outcome.status);
        frame.result = record.result.unwrap_or(outcome.value);
        Ok(())
    }
}

/// `return [expr]`: stores the result and unwinds the function body.
fn return_value(frame: &mut Frame<'_>) -> Result<()> {
    let source = frame.rest().to_string();
    let exec = frame.executer();
    let value = if source.is_empty() {
        Value::Null
    } else {
        evaluate(&source, exec)?
    };
    exec.set_return(value)?;
    exec.request_break();
    Ok(())
}

/// `SetStatus code`: sets the status reported by the enclosing call.
fn set_status(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    let status = i32::try_from(frame.get_int(1)?).map_err(|_| ScriptError::InvalidCast {
        index: 1,
        expected: "32-bit integer",
    })?;
    frame.status = status;
    frame.executer().set_call_status(status)
}

/// Splits `name(a$, b$)` into the function name and its parameter names.
/// Commas nested in parentheses or quotes do not separate parameters.
fn parse_template(text: &str) -> Result<(String, Vec<String>)> {
    let malformed = || ScriptError::MalformedFunction(text.to_string());
    let open = text.find('(').ok_or_else(malformed)?;
    let name = text[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(malformed());
    }

    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut last = open + 1;
    let mut chars = text[open..].char_indices().map(|(i, c)| (i + open, c));

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (Some(_), '\\') => {
                chars.next();
            }
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') | (None, ',') => {
                if c == ')' {
                    depth -= 1;
                }
                if depth == 0 || (depth == 1 && c == ',') {
                    let param = text[last..i].trim();
                    if !param.is_empty() {
                        params.push(param.to_string());
                    }
                    last = i + 1;
                    if depth == 0 {
                        if !text[i + 1..].trim().is_empty() {
                            return Err(malformed());
                        }
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(malformed());
    }

    for param in &params {
        let valid = param
            .strip_suffix('$')
            .is_some_and(|stem| !stem.is_empty() && stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
        if !valid {
            return Err(ScriptError::InvalidVariableName(param.clone()));
        }
    }
    Ok((name.to_string(), params))
}
