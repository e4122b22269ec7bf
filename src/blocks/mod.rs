//! Control-flow blocks.
//!
//! A block is carved out of the line sequence the first time the executer
//! reaches its header. [`parse_block`] does the carving for every kind: it keeps
//! a nesting counter, seeded at one by the header, that goes up on each nested
//! opening line and down on each closing line. The line that brings it back to
//! zero is the footer.

mod conditional;
mod function;
mod loops;

pub use conditional::{IfBlock, SelectBlock};
pub use function::{CallRecord, FuncBlock};
pub use loops::{DoBlock, ForBlock, WhileBlock};

use crate::error::{Result, ScriptError};
use crate::executer::{Executer, Outcome};
use crate::line::Line;

/// Builds a block whose header sits at `index`.
pub type BlockCreator = fn(usize, &[Line]) -> Result<Block>;

/// Header keywords and the constructors registered for them.
pub const BLOCKS: &[(&str, BlockCreator)] = &[
    ("IF", IfBlock::create),
    ("DO", DoBlock::create),
    ("WHILE", WhileBlock::create),
    ("FOR", ForBlock::create),
    ("SELECT", SelectBlock::create),
];

#[derive(Debug, Clone)]
pub enum Block {
    If(IfBlock),
    Do(DoBlock),
    While(WhileBlock),
    For(ForBlock),
    Select(SelectBlock),
}

impl Block {
    pub fn execute(&self, exec: &mut Executer) -> Result<Outcome> {
        match self {
            Block::If(block) => block.execute(exec),
            Block::Do(block) => block.execute(exec),
            Block::While(block) => block.execute(exec),
            Block::For(block) => block.execute(exec),
            Block::Select(block) => block.execute(exec),
        }
    }

    /// Number of source lines the block spans, header and footer included.
    pub fn length(&self) -> usize {
        match self {
            Block::If(block) => block.length(),
            Block::Do(block) => block.lines.length(),
            Block::While(block) => block.lines.length(),
            Block::For(block) => block.lines.length(),
            Block::Select(block) => block.lines.length(),
        }
    }

    pub fn header(&self) -> &Line {
        match self {
            Block::If(block) => &block.lines.header,
            Block::Do(block) => &block.lines.header,
            Block::While(block) => &block.lines.header,
            Block::For(block) => &block.lines.header,
            Block::Select(block) => &block.lines.header,
        }
    }
}

/// Header, body and footer of a parsed block.
#[derive(Debug, Clone)]
pub struct BlockLines {
    pub header: Line,
    pub body: Vec<Line>,
    pub footer: Line,
}

impl BlockLines {
    pub fn length(&self) -> usize {
        self.body.len() + 2
    }
}

pub fn parse_block(
    index: usize,
    lines: &[Line],
    is_open: impl Fn(&Line) -> bool,
    is_close: impl Fn(&Line) -> bool,
) -> Result<BlockLines> {
    let header = lines
        .get(index)
        .cloned()
        .ok_or_else(|| ScriptError::InvalidExpression("block header is out of range".into()))?;

    let mut depth = 1usize;
    let mut body = Vec::new();
    for line in &lines[index + 1..] {
        if is_open(line) {
            depth += 1;
        } else if is_close(line) {
            depth -= 1;
            if depth == 0 {
                return Ok(BlockLines {
                    header,
                    body,
                    footer: line.clone(),
                });
            }
        }
        body.push(line.clone());
    }
    Err(unterminated(&header))
}

pub(crate) fn unterminated(header: &Line) -> ScriptError {
    ScriptError::UnterminatedBlock {
        line: header.number(),
        block: header.visible_name().to_string(),
    }
}

/// Line number of the first top-level block in `lines` that never closes.
pub fn unterminated_at(lines: &[Line]) -> Option<u32> {
    let mut index = 0;
    while index < lines.len() {
        let creator = BLOCKS
            .iter()
            .find(|(keyword, _)| lines[index].name_is(keyword))
            .map(|(_, creator)| *creator);
        match creator.map(|create| create(index, lines)) {
            Some(Ok(block)) => index += block.length(),
            Some(Err(ScriptError::UnterminatedBlock { line, .. })) => return Some(line),
            _ => index += 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(source: &str) -> Vec<Line> {
        source
            .lines()
            .enumerate()
            .map(|(i, text)| Line::new(i as u32 + 1, text))
            .collect()
    }

    #[test]
    fn nested_blocks_share_the_counter() {
        let code = lines("WHILE a\nWHILE b\nx\nWEND\ny\nWEND\nz");
        let parsed = parse_block(0, &code, |l| l.name_is("WHILE"), |l| l.text_is("WEND")).unwrap();
        assert_eq!(parsed.length(), 6);
        assert_eq!(parsed.footer.number(), 6);
        let body: Vec<&str> = parsed.body.iter().map(Line::text).collect();
        assert_eq!(body, vec!["WHILE b", "x", "WEND", "y"]);
    }

    #[test]
    fn unterminated_block_names_its_header() {
        let code = lines("x\nWHILE a\nWHILE b\nWEND");
        let err = parse_block(1, &code, |l| l.name_is("WHILE"), |l| l.text_is("WEND")).unwrap_err();
        assert!(matches!(err, ScriptError::UnterminatedBlock { line: 2, ref block } if block == "WHILE"));
    }

    #[test]
    fn closing_text_ignores_case_and_spacing() {
        let code = lines("SELECT x\nend   select");
        let parsed = parse_block(0, &code, |l| l.name_is("SELECT"), |l| l.text_is("END SELECT")).unwrap();
        assert!(parsed.body.is_empty());
    }
}
