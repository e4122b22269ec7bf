//! Script lines and the scanner that turns raw source text into them.

use crate::blocks::FuncBlock;
use crate::error::{Result, ScriptError};
use std::cmp::Ordering;
use std::fmt;

/// One logical statement line. Equality and ordering use only the line number.
#[derive(Debug, Clone)]
pub struct Line {
    number: u32,
    text: String,
    name: String,
    call_shaped: bool,
    visible_name: String,
}

impl Line {
    pub fn new(number: u32, text: &str) -> Self {
        let text = text.trim().to_string();
        let (name, call_shaped) = leading_name(&text);
        Line {
            number,
            visible_name: name.clone(),
            text,
            name,
            call_shaped,
        }
    }

    /// A copy with different text. The visible name of the original is kept.
    pub fn with_text(&self, text: &str) -> Self {
        let mut line = Line::new(self.number, text);
        line.visible_name = self.visible_name.clone();
        line
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The leading identifier, used to find commands and blocks.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name shown in error reports.
    pub fn visible_name(&self) -> &str {
        &self.visible_name
    }

    /// True when a `(` follows the name with no space in between.
    pub fn is_call_shaped(&self) -> bool {
        self.call_shaped
    }

    pub fn name_is(&self, keyword: &str) -> bool {
        self.name.eq_ignore_ascii_case(keyword)
    }

    /// Case-insensitive comparison of the whole text with runs of whitespace collapsed.
    pub fn text_is(&self, text: &str) -> bool {
        let mut ours = self.text.split_whitespace();
        let mut theirs = text.split_whitespace();
        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return true,
                (Some(a), Some(b)) if a.eq_ignore_ascii_case(b) => continue,
                _ => return false,
            }
        }
    }

    /// Everything after the leading name, trimmed.
    pub fn rest(&self) -> &str {
        self.text[self.name.len()..].trim()
    }
}

fn leading_name(text: &str) -> (String, bool) {
    let paren = text.find('(');
    let space = text.find(char::is_whitespace);
    match (paren, space) {
        (None, None) => (text.to_string(), false),
        (None, Some(s)) => (text[..s].to_string(), false),
        (Some(p), None) => (text[..p].to_string(), true),
        (Some(p), Some(s)) if s < p => (text[..s].to_string(), false),
        (Some(p), Some(_)) => (text[..p].to_string(), true),
    }
}

/// `name$...`: the line is an assignment and runs through `LET`.
fn starts_with_variable(text: &str) -> bool {
    let stem = text.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_');
    stem.len() < text.len() && stem.starts_with('$')
}

impl PartialEq for Line {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Line {}

impl PartialOrd for Line {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Line {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number.cmp(&other.number)
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Output of the scanner: top-level lines with function declarations pulled out.
#[derive(Debug, Default)]
pub struct Script {
    pub lines: Vec<Line>,
    pub functions: Vec<FuncBlock>,
}

/// Splits raw text into numbered lines and extracts every `FUNCTION` block.
pub fn scan(source: &str) -> Result<Script> {
    let physical: Vec<&str> = source.lines().collect();
    scan_lines(&physical)
}

pub fn scan_lines<S: AsRef<str>>(physical: &[S]) -> Result<Script> {
    let mut lines = Vec::new();
    let mut function_lines = Vec::new();

    let mut index = 0;
    while index < physical.len() {
        let number = index as u32 + 1;
        let mut text = physical[index].as_ref().trim().to_string();
        while text.ends_with('_') {
            index += 1;
            let Some(next) = physical.get(index) else {
                return Err(ScriptError::EndOfCode { line: number });
            };
            text.pop();
            text.push_str(next.as_ref().trim());
        }
        index += 1;

        if text.is_empty() || text.starts_with(';') {
            continue;
        }

        let mut line = Line::new(number, &text);
        if starts_with_variable(line.text()) {
            line = line.with_text(&format!("LET {}", line.text()));
        } else if line.name_is("FUNCTION") {
            function_lines.push(number);
        } else {
            line.visible_name = line.visible_name.to_uppercase();
        }
        lines.push(line);
    }

    let mut functions = Vec::with_capacity(function_lines.len());
    for number in function_lines {
        let Some(start) = lines.iter().position(|l| l.number() == number) else {
            return Err(ScriptError::NestedFunction { line: number });
        };
        let func = FuncBlock::parse(start, &lines)?;
        lines.drain(start..start + func.length());
        functions.push(func);
    }

    Ok(Script { lines, functions })
}
