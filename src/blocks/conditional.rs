use super::{parse_block, unterminated, Block, BlockLines};
use crate::error::{Result, ScriptError};
use crate::evaluator::{evaluate, Evaluator};
use crate::executer::{Executer, Outcome};
use crate::line::Line;
use crate::value::Value;

/// `IF cond THEN ... [ELSE ...] END IF`
#[derive(Debug, Clone)]
pub struct IfBlock {
    pub(crate) lines: BlockLines,
    else_body: Option<Vec<Line>>,
}

impl IfBlock {
    pub fn create(index: usize, lines: &[Line]) -> Result<Block> {
        let header = lines[index].clone();
        let mut body = Vec::new();
        let mut else_body: Option<Vec<Line>> = None;
        let mut depth = 1usize;

        for line in &lines[index + 1..] {
            if line.name_is("IF") {
                depth += 1;
            } else if depth == 1 && line.name_is("ELSE") {
                if !line.text_is("ELSE") {
                    return Err(malformed("IF", "ELSE takes no condition"));
                }
                if else_body.is_some() {
                    return Err(malformed("IF", "only one ELSE is allowed"));
                }
                else_body = Some(Vec::new());
                continue;
            } else if line.text_is("END IF") {
                depth -= 1;
                if depth == 0 {
                    return Ok(Block::If(IfBlock {
                        lines: BlockLines {
                            header,
                            body,
                            footer: line.clone(),
                        },
                        else_body,
                    }));
                }
            }
            match else_body.as_mut() {
                Some(lines) => lines.push(line.clone()),
                None => body.push(line.clone()),
            }
        }
        Err(unterminated(&header))
    }

    pub fn length(&self) -> usize {
        match &self.else_body {
            Some(lines) => self.lines.length() + lines.len() + 1,
            None => self.lines.length(),
        }
    }

    fn condition(&self) -> Result<&str> {
        let rest = self.lines.header.rest();
        let at = rest
            .len()
            .checked_sub(4)
            .filter(|&at| rest.is_char_boundary(at) && rest[at..].eq_ignore_ascii_case("THEN"));
        match at {
            Some(0) => Err(ScriptError::NoCondition),
            Some(at) if rest[..at].ends_with(char::is_whitespace) || rest[..at].ends_with(')') => {
                Ok(rest[..at].trim())
            }
            _ => Err(malformed("IF", "expected 'THEN'")),
        }
    }

    pub fn execute(&self, exec: &mut Executer) -> Result<Outcome> {
        let condition = self.condition()?;
        if Evaluator::new(condition).evaluate_bool(exec)? {
            exec.execute_lines(&self.lines.body)
        } else if let Some(lines) = &self.else_body {
            exec.execute_lines(lines)
        } else {
            Ok(Outcome::default())
        }
    }
}

/// `SELECT expr` followed by `CASE key` / `DEFAULT` sections and `END SELECT`.
#[derive(Debug, Clone)]
pub struct SelectBlock {
    pub(crate) lines: BlockLines,
}

struct Cases {
    keyed: Vec<(Value, Vec<Line>)>,
    default: Option<Vec<Line>>,
}

impl Cases {
    /// A repeated key replaces the section registered before it.
    fn insert(&mut self, key: Value, body: Vec<Line>) {
        match self.keyed.iter_mut().find(|(k, _)| k.key_eq(&key)) {
            Some(entry) => entry.1 = body,
            None => self.keyed.push((key, body)),
        }
    }

    fn find(&self, value: &Value) -> Option<&[Line]> {
        self.keyed
            .iter()
            .find(|(k, _)| k.key_eq(value))
            .map(|(_, body)| body.as_slice())
            .or(self.default.as_deref())
    }
}

enum Section {
    Case(String),
    Default,
}

impl SelectBlock {
    pub fn create(index: usize, lines: &[Line]) -> Result<Block> {
        let lines = parse_block(index, lines, |l| l.name_is("SELECT"), |l| l.text_is("END SELECT"))?;
        Ok(Block::Select(SelectBlock { lines }))
    }

    /// Splits the body into sections and evaluates their keys in order.
    fn cases(&self, exec: &mut Executer) -> Result<Cases> {
        let mut sections: Vec<(Section, Vec<Line>)> = Vec::new();
        let mut depth = 0usize;

        for line in &self.lines.body {
            if depth == 0 && (line.name_is("CASE") || line.name_is("DEFAULT")) {
                let section = if line.name_is("DEFAULT") {
                    Section::Default
                } else if line.rest().is_empty() {
                    return Err(ScriptError::NoCondition);
                } else {
                    Section::Case(line.rest().to_string())
                };
                sections.push((section, Vec::new()));
                continue;
            }
            if line.name_is("SELECT") {
                depth += 1;
            } else if line.text_is("END SELECT") {
                depth = depth.saturating_sub(1);
            }
            match sections.last_mut() {
                Some((_, body)) => body.push(line.clone()),
                None => return Err(malformed("SELECT", &format!("expected CASE before '{}'", line.text()))),
            }
        }

        let mut cases = Cases {
            keyed: Vec::new(),
            default: None,
        };
        for (section, body) in sections {
            match section {
                Section::Case(key) => {
                    let key = evaluate(&key, exec)?;
                    cases.insert(key, body);
                }
                Section::Default => cases.default = Some(body),
            }
        }
        Ok(cases)
    }

    pub fn execute(&self, exec: &mut Executer) -> Result<Outcome> {
        let expr = self.lines.header.rest();
        if expr.is_empty() {
            return Err(ScriptError::NoCondition);
        }
        let value = evaluate(expr, exec)?;
        let cases = self.cases(exec)?;
        match cases.find(&value) {
            Some(body) => exec.execute_lines(body),
            None => Ok(Outcome::default()),
        }
    }
}

fn malformed(block: &str, reason: &str) -> ScriptError {
    ScriptError::MalformedBlock {
        block: block.to_string(),
        reason: reason.to_string(),
    }
}
