use super::{parse_block, Block, BlockLines};
use crate::error::{Result, ScriptError};
use crate::evaluator::{evaluate, parse_variable, Evaluator};
use crate::executer::{Executer, Outcome};
use crate::line::Line;
use crate::value::Value;

/// Runs one pass of a loop body. Returns false once the loop must stop.
fn run_body(exec: &mut Executer, body: &[Line], outcome: &mut Outcome) -> Result<bool> {
    *outcome = exec.execute_lines(body)?;
    if exec.break_requested() {
        exec.honor_break();
        return Ok(false);
    }
    Ok(true)
}

/// `DO WHILE cond ... LOOP` or `DO UNTIL cond ... LOOP`. The body runs before
/// the first test.
#[derive(Debug, Clone)]
pub struct DoBlock {
    pub(crate) lines: BlockLines,
}

impl DoBlock {
    pub fn create(index: usize, lines: &[Line]) -> Result<Block> {
        let lines = parse_block(index, lines, |l| l.name_is("DO"), |l| l.text_is("LOOP"))?;
        Ok(Block::Do(DoBlock { lines }))
    }

    fn condition(&self) -> Result<String> {
        let rest = self.lines.header.rest();
        let (keyword, condition) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let condition = condition.trim();
        if keyword.is_empty() || condition.is_empty() {
            return Err(ScriptError::NoCondition);
        }
        if keyword.eq_ignore_ascii_case("UNTIL") {
            Ok(format!("NOT ({})", condition))
        } else if keyword.eq_ignore_ascii_case("WHILE") {
            Ok(condition.to_string())
        } else {
            Err(ScriptError::MalformedBlock {
                block: "DO".into(),
                reason: "expected 'UNTIL' or 'WHILE'".into(),
            })
        }
    }

    pub fn execute(&self, exec: &mut Executer) -> Result<Outcome> {
        let mut condition = Evaluator::new(&self.condition()?);
        let mut outcome = Outcome::default();
        while run_body(exec, &self.lines.body, &mut outcome)? {
            condition.reparse();
            if !condition.evaluate_bool(exec)? {
                break;
            }
        }
        Ok(outcome)
    }
}

/// `WHILE cond ... WEND`
#[derive(Debug, Clone)]
pub struct WhileBlock {
    pub(crate) lines: BlockLines,
}

impl WhileBlock {
    pub fn create(index: usize, lines: &[Line]) -> Result<Block> {
        let lines = parse_block(index, lines, |l| l.name_is("WHILE"), |l| l.text_is("WEND"))?;
        Ok(Block::While(WhileBlock { lines }))
    }

    pub fn execute(&self, exec: &mut Executer) -> Result<Outcome> {
        let source = self.lines.header.rest();
        if source.is_empty() {
            return Err(ScriptError::NoCondition);
        }
        let mut condition = Evaluator::new(source);
        let mut outcome = Outcome::default();
        while condition.evaluate_bool(exec)? {
            if !run_body(exec, &self.lines.body, &mut outcome)? {
                break;
            }
            condition.reparse();
        }
        Ok(outcome)
    }
}

/// `FOR var = start TO end [STEP step] ... NEXT`
#[derive(Debug, Clone)]
pub struct ForBlock {
    pub(crate) lines: BlockLines,
}

struct ForHeader<'a> {
    variable: &'a str,
    start: &'a str,
    end: &'a str,
    step: Option<&'a str>,
}

impl ForBlock {
    pub fn create(index: usize, lines: &[Line]) -> Result<Block> {
        let lines = parse_block(index, lines, |l| l.name_is("FOR"), |l| l.name_is("NEXT"))?;
        Ok(Block::For(ForBlock { lines }))
    }

    fn header(&self) -> Result<ForHeader<'_>> {
        let rest = self.lines.header.rest();
        let malformed = |reason: &str| ScriptError::MalformedBlock {
            block: "FOR".into(),
            reason: reason.into(),
        };
        let (variable, range) = rest.split_once('=').ok_or_else(|| malformed("expected '='"))?;
        let to = find_keyword(range, "TO").ok_or_else(|| malformed("expected 'TO'"))?;
        let (start, tail) = (&range[..to], &range[to + 2..]);
        let (end, step) = match find_keyword(tail, "STEP") {
            Some(at) => (&tail[..at], Some(tail[at + 4..].trim())),
            None => (tail, None),
        };
        let header = ForHeader {
            variable: variable.trim(),
            start: start.trim(),
            end: end.trim(),
            step,
        };
        if header.start.is_empty() || header.end.is_empty() || header.step == Some("") {
            return Err(ScriptError::NoCondition);
        }
        Ok(header)
    }

    pub fn execute(&self, exec: &mut Executer) -> Result<Outcome> {
        let header = self.header()?;
        let variable = parse_variable(header.variable)?;
        let start = evaluate(header.start, exec)?;
        let end = evaluate(header.end, exec)?.to_f64()?;
        let step = match header.step {
            Some(step) => evaluate(step, exec)?.to_f64()?,
            None => 1.0,
        };
        if step == 0.0 {
            return Err(ScriptError::Argument("FOR step cannot be zero".into()));
        }

        variable.write(exec, start)?;
        let mut outcome = Outcome::default();
        loop {
            let current = variable.read(exec)?.to_f64()?;
            let in_range = if step > 0.0 { current <= end } else { current >= end };
            if !in_range || !run_body(exec, &self.lines.body, &mut outcome)? {
                break;
            }
            let next = variable.read(exec)?.to_f64()? + step;
            variable.write(exec, Value::from(next))?;
        }
        Ok(outcome)
    }
}

/// Byte offset of `keyword` as a whole word outside quotes and parentheses.
fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(_) if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ if depth == 0 => {
                    let end = i + keyword.len();
                    let before = i == 0 || bytes[i - 1].is_ascii_whitespace();
                    let after = end == bytes.len() || bytes.get(end).is_some_and(|c| c.is_ascii_whitespace());
                    if before && after && text.get(i..end).is_some_and(|w| w.eq_ignore_ascii_case(keyword)) {
                        return Some(i);
                    }
                }
                _ => {}
            },
        }
        i += 1;
    }
    None
}
