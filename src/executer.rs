//! The driver: scans script text, installs user functions and dispatches each
//! line to a block, a command or the expression evaluator.

use crate::blocks::{unterminated_at, CallRecord, FuncBlock, BLOCKS};
use crate::config::Config;
use crate::context::{ContextRef, ObjectKind};
use crate::error::{Result, ScriptError};
use crate::evaluator::evaluate;
use crate::frame::{Callable, Frame};
use crate::libraries;
use crate::line::{scan, scan_lines, Line, Script};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Value and status left behind by the last statement of a line sequence.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub value: Value,
    pub status: i32,
}

pub struct Executer {
    global: ContextRef,
    context: ContextRef,
    break_request: bool,
    exit_request: bool,
    current_line: u32,
    calls: Vec<CallRecord>,
    config: Config,
}

impl Default for Executer {
    fn default() -> Self {
        Executer::new()
    }
}

impl Executer {
    /// An executer with the statement commands and block keywords installed,
    /// but no function libraries.
    pub fn new() -> Self {
        Executer::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let global = ContextRef::root_with(BLOCKS, libraries::statements::COMMANDS);
        Executer {
            context: global.clone(),
            global,
            break_request: false,
            exit_request: false,
            current_line: 0,
            calls: Vec::new(),
            config,
        }
    }

    /// [`Executer::new`] plus every builtin function library.
    pub fn with_standard_library() -> Self {
        let mut exec = Executer::new();
        exec.load_standard_library();
        exec
    }

    pub fn load_standard_library(&mut self) {
        if let Err(err) = libraries::install_standard(&self.global) {
            tracing::warn!(error = %err, "standard library could not be installed");
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn global(&self) -> ContextRef {
        self.global.clone()
    }

    pub fn context(&self) -> ContextRef {
        self.context.clone()
    }

    pub fn set_context(&mut self, context: ContextRef) {
        self.context = context;
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    pub fn break_requested(&self) -> bool {
        self.break_request
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_request
    }

    pub fn request_break(&mut self) {
        self.break_request = true;
    }

    /// Stops the whole run. The break flag stays raised until [`Executer::reset`].
    pub fn request_exit(&mut self) {
        self.exit_request = true;
        self.break_request = true;
    }

    /// Clears a pending break, unless an exit or a `return` still has to unwind.
    pub fn honor_break(&mut self) {
        let returning = self.calls.last().is_some_and(CallRecord::returned);
        if !self.exit_request && !returning {
            self.break_request = false;
        }
    }

    /// Clears both flags, so a host can keep using the executer after `EXIT`.
    pub fn reset(&mut self) {
        self.break_request = false;
        self.exit_request = false;
        self.calls.clear();
        self.context = self.global.clone();
    }

    pub fn call_depth(&self) -> usize {
        self.calls.len()
    }

    pub fn push_call(&mut self) {
        self.calls.push(CallRecord::default());
    }

    pub fn pop_call(&mut self) -> CallRecord {
        self.calls.pop().unwrap_or_default()
    }

    pub fn set_return(&mut self, value: Value) -> Result<()> {
        match self.calls.last_mut() {
            Some(record) => {
                record.result = Some(value);
                Ok(())
            }
            None => Err(ScriptError::NoOpeningStatement("RETURN".into())),
        }
    }

    pub fn set_call_status(&mut self, status: i32) -> Result<()> {
        match self.calls.last_mut() {
            Some(record) => {
                record.status = Some(status);
                Ok(())
            }
            None => Err(ScriptError::NoOpeningStatement("SETSTATUS".into())),
        }
    }

    /// Runs a whole script and returns the value of its last statement.
    pub fn execute(&mut self, source: &str) -> Result<Value> {
        let script = scan(source)?;
        self.run_script(script)
    }

    /// Same as [`Executer::execute`] for text that is already split into lines.
    pub fn execute_source_lines<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<Value> {
        let script = scan_lines(lines)?;
        self.run_script(script)
    }

    pub fn execute_file(&mut self, path: &Path) -> Result<Value> {
        let source = fs::read_to_string(path)?;
        self.execute(&source)
    }

    fn run_script(&mut self, script: Script) -> Result<Value> {
        self.install_functions(script.functions)?;
        let outcome = self.execute_lines(&script.lines)?;
        self.honor_break();
        Ok(outcome.value)
    }

    pub fn install_functions(&mut self, functions: Vec<FuncBlock>) -> Result<()> {
        for func in functions {
            let name = func.name().to_string();
            tracing::debug!(function = %name, params = func.params().len(), "function installed");
            self.global.set_function(&name, Callable::User(Rc::new(func)))?;
        }
        Ok(())
    }

    /// Executes lines in the current context until they run out or a break
    /// is raised. Errors are wrapped with the failing line.
    pub fn execute_lines(&mut self, lines: &[Line]) -> Result<Outcome> {
        let mut outcome = Outcome::default();
        let mut index = 0;
        while index < lines.len() {
            if self.break_request {
                break;
            }
            let line = &lines[index];
            self.current_line = line.number();
            let (result, consumed) = match self.execute_line(index, lines) {
                Ok(done) => done,
                Err(err) => return Err(ScriptError::at_line(line.number(), line.visible_name(), err)),
            };
            outcome = result;
            index += consumed;
        }
        Ok(outcome)
    }

    fn execute_line(&mut self, index: usize, lines: &[Line]) -> Result<(Outcome, usize)> {
        let line = &lines[index];
        let context = self.context();

        if context.lookup(line.name(), ObjectKind::Block)?.is_some() {
            let creator = context.get_block(line.name())?;
            let block = creator(index, lines)?;
            tracing::debug!(block = line.visible_name(), line = line.number(), "entering block");

            self.context = context.create_child()?;
            let result = ensure_sufficient_stack(|| block.execute(self));
            let inner = std::mem::replace(&mut self.context, context);
            inner.collect()?;
            return Ok((result?, block.length()));
        }

        if !line.is_call_shaped() && context.lookup(line.name(), ObjectKind::Command)?.is_some() {
            let command = context.get_command(line.name())?;
            let mut frame = Frame::from_text(self, line.text())?;
            command.invoke(&mut frame)?;
            let outcome = Outcome {
                value: std::mem::take(&mut frame.result),
                status: frame.status,
            };
            return Ok((outcome, 1));
        }

        let value = evaluate(line.text(), self)?;
        Ok((Outcome { value, status: 0 }, 1))
    }

    /// Locates an include file: as given, then under each include path.
    pub fn resolve_include(&self, name: &str) -> Result<PathBuf> {
        let direct = PathBuf::from(name);
        if direct.is_file() {
            return Ok(direct);
        }
        self.config
            .include_paths
            .iter()
            .map(|dir| dir.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| {
                ScriptError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("include file '{}' was not found", name),
                ))
            })
    }

    /// Loads a file's functions into the global context and runs its lines in
    /// the current context.
    pub fn include(&mut self, name: &str) -> Result<Value> {
        let path = self.resolve_include(name)?;
        tracing::debug!(path = %path.display(), "including file");
        let source = fs::read_to_string(&path)?;
        let script = scan(&source)?;
        self.install_functions(script.functions)?;
        let outcome = self.execute_lines(&script.lines)?;
        Ok(outcome.value)
    }
}

/// Whether an interactive buffer still needs more lines before it can run:
/// it ends in a continuation or a block is not yet closed.
pub fn needs_more_input(buffer: &str) -> bool {
    match scan(buffer) {
        Err(ScriptError::EndOfCode { .. }) | Err(ScriptError::UnterminatedBlock { .. }) => true,
        Err(_) => false,
        Ok(script) => unterminated_at(&script.lines).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn last_statement_value_is_returned() {
        let mut exec = Executer::new();
        assert_eq!(exec.execute("x$ = 2\nx$ * 21").unwrap(), Value::Int(42));
    }

    #[test]
    fn errors_are_wrapped_with_the_line() {
        let mut exec = Executer::new();
        let err = exec.execute("x$ = 1\n\ny$ = x$ / 0").unwrap_err();
        assert_eq!(err.line(), Some(3));
        assert!(matches!(err.root(), ScriptError::DivideByZero));
        assert!(err.report().starts_with("An error occurred at 'y$' on line 3"));
    }

    #[test]
    fn nested_errors_report_every_frame() {
        let mut exec = Executer::new();
        let err = exec.execute("WHILE TRUE\nIF 1 = 1 THEN\nz$ = nope$\nEND IF\nWEND").unwrap_err();
        let report = err.report();
        assert!(report.starts_with("An error occurred at 'z$' on line 3\n"));
        assert!(report.contains("\tat 'IF' on line 2\n"));
        assert!(report.contains("\tat 'WHILE' on line 1\n"));
    }

    #[test]
    fn block_context_is_collected() {
        let mut exec = Executer::new();
        exec.execute("IF TRUE THEN\nDIM inner$ = 1\nEND IF").unwrap();
        assert!(exec.global().get_variable("inner$").is_err());
        assert!(exec.context().ptr_eq(&exec.global()));
    }

    #[test]
    fn stray_closing_keyword_has_no_opening() {
        let mut exec = Executer::new();
        let err = exec.execute("WEND").unwrap_err();
        assert!(matches!(err.root(), ScriptError::NoOpeningStatement(_)));
    }

    #[test]
    fn interactive_buffer_detection() {
        assert!(needs_more_input("x$ = 1 + _"));
        assert!(needs_more_input("WHILE x$ < 3"));
        assert!(needs_more_input("IF 1 THEN\nIF 2 THEN\nEND IF"));
        assert!(needs_more_input("FUNCTION f(a$)\nreturn a$"));
        assert!(!needs_more_input("IF 1 THEN\nEND IF"));
        assert!(!needs_more_input("x$ = 1"));
    }

    #[test]
    fn exit_stops_and_reset_recovers() {
        let mut exec = Executer::new();
        exec.execute("a$ = 1\nEXIT\na$ = 2").unwrap();
        assert!(exec.exit_requested());
        assert_eq!(exec.global().get_variable("a$").unwrap(), Value::Int(1));
        exec.reset();
        exec.execute("a$ = 3").unwrap();
        assert_eq!(exec.global().get_variable("a$").unwrap(), Value::Int(3));
    }
}
