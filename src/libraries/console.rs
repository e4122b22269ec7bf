//! Standard stream functions.

use crate::error::Result;
use crate::frame::{Frame, Library};
use crate::value::Value;
use std::io::{self, BufRead, Write};

pub const FUNCTIONS: Library = &[
    ("StdWrite", std_write),
    ("StdWriteLine", std_write_line),
    ("StdReadLine", std_read_line),
];

fn write_value(out: &mut impl Write, value: Option<&Value>, newline: bool) -> io::Result<()> {
    if let Some(value) = value {
        write!(out, "{}", value)?;
    }
    if newline {
        writeln!(out)?;
    }
    out.flush()
}

/// One line without its terminator, or `None` at end of input.
fn read_line(input: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let trimmed = line.trim_end_matches(['\n', '\r']).len();
    line.truncate(trimmed);
    Ok(Some(line))
}

fn std_write(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(2)?;
    write_value(&mut io::stdout().lock(), Some(frame.get(1)?), false)?;
    Ok(())
}

/// `StdWriteLine([value])`
fn std_write_line(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args_between(1, 2)?;
    write_value(&mut io::stdout().lock(), frame.args().get(1), true)?;
    Ok(())
}

fn std_read_line(frame: &mut Frame<'_>) -> Result<()> {
    frame.assert_args(1)?;
    if let Some(line) = read_line(&mut io::stdin().lock())? {
        frame.set_result(line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn values_are_written_with_display() {
        let mut out = Vec::new();
        write_value(&mut out, Some(&Value::Int(3)), false).unwrap();
        write_value(&mut out, Some(&Value::Array(vec![Value::from("a"), Value::Null])), true).unwrap();
        write_value(&mut out, None, true).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "3{ \"a\",  }\n\n");
    }

    #[test]
    fn lines_lose_their_terminator() {
        let mut input = io::Cursor::new("first\r\nsecond\n");
        assert_eq!(read_line(&mut input).unwrap(), Some("first".to_string()));
        assert_eq!(read_line(&mut input).unwrap(), Some("second".to_string()));
        assert_eq!(read_line(&mut input).unwrap(), None);
    }
}
