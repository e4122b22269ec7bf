//! The scope chain.
//!
//! Each [`Context`] holds independent name tables for variables, constants,
//! functions, commands and block constructors. Lookups walk from the innermost
//! context outward; assignment to an existing name mutates the context that
//! declared it. Names are case-insensitive.

use crate::blocks::BlockCreator;
use crate::error::{Result, ScriptError};
use crate::frame::{BuiltinFn, Callable};
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Variable,
    Constant,
    Function,
    Command,
    Block,
}

impl ObjectKind {
    pub fn describe(self) -> &'static str {
        match self {
            ObjectKind::Variable => "variable",
            ObjectKind::Constant => "constant",
            ObjectKind::Function => "function",
            ObjectKind::Command => "command",
            ObjectKind::Block => "block",
        }
    }
}

/// What a name means in a single context.
#[derive(Clone)]
pub enum Resolved {
    Variable(Value),
    Constant(Value),
    Function(Callable),
    Command(Callable),
    Block(BlockCreator),
    NotFound,
}

impl Resolved {
    pub fn kind(&self) -> Option<ObjectKind> {
        match self {
            Resolved::Variable(_) => Some(ObjectKind::Variable),
            Resolved::Constant(_) => Some(ObjectKind::Constant),
            Resolved::Function(_) => Some(ObjectKind::Function),
            Resolved::Command(_) => Some(ObjectKind::Command),
            Resolved::Block(_) => Some(ObjectKind::Block),
            Resolved::NotFound => None,
        }
    }
}

#[derive(Default)]
pub struct Context {
    parent: Option<ContextRef>,
    variables: HashMap<String, Value>,
    constants: HashMap<String, Value>,
    functions: HashMap<String, Callable>,
    commands: HashMap<String, Callable>,
    blocks: HashMap<String, BlockCreator>,
    /// Assignments never walk past a function scope.
    function_scope: bool,
    collected: bool,
}

fn key(name: &str) -> String {
    name.to_ascii_lowercase()
}

impl Context {
    fn has(&self, key: &str, kind: ObjectKind) -> bool {
        match kind {
            ObjectKind::Variable => self.variables.contains_key(key),
            ObjectKind::Constant => self.constants.contains_key(key),
            ObjectKind::Function => self.functions.contains_key(key),
            ObjectKind::Command => self.commands.contains_key(key),
            ObjectKind::Block => self.blocks.contains_key(key),
        }
    }

    fn fetch(&self, key: &str, kind: ObjectKind) -> Resolved {
        let found = match kind {
            ObjectKind::Variable => self.variables.get(key).cloned().map(Resolved::Variable),
            ObjectKind::Constant => self.constants.get(key).cloned().map(Resolved::Constant),
            ObjectKind::Function => self.functions.get(key).cloned().map(Resolved::Function),
            ObjectKind::Command => self.commands.get(key).cloned().map(Resolved::Command),
            ObjectKind::Block => self.blocks.get(key).copied().map(Resolved::Block),
        };
        found.unwrap_or(Resolved::NotFound)
    }

    /// Resolves a name in this context only, checking the tables in a fixed order.
    fn resolve_here(&self, key: &str) -> Resolved {
        [
            ObjectKind::Variable,
            ObjectKind::Constant,
            ObjectKind::Function,
            ObjectKind::Command,
            ObjectKind::Block,
        ]
        .into_iter()
        .map(|kind| self.fetch(key, kind))
        .find(|r| !matches!(r, Resolved::NotFound))
        .unwrap_or(Resolved::NotFound)
    }
}

/// Shared handle to one level of the scope chain.
#[derive(Clone, Default)]
pub struct ContextRef(Rc<RefCell<Context>>);

impl ContextRef {
    /// A root context with no parent.
    pub fn root() -> Self {
        ContextRef::default()
    }

    /// A root context preloaded with block keywords and builtin commands.
    pub fn root_with(blocks: &[(&str, BlockCreator)], commands: &[(&str, BuiltinFn)]) -> Self {
        let context = Context {
            blocks: blocks.iter().map(|(name, creator)| (key(name), *creator)).collect(),
            commands: commands
                .iter()
                .map(|(name, func)| (key(name), Callable::Builtin(*func)))
                .collect(),
            ..Context::default()
        };
        ContextRef(Rc::new(RefCell::new(context)))
    }

    fn with_parent(parent: &ContextRef, function_scope: bool) -> Self {
        ContextRef(Rc::new(RefCell::new(Context {
            parent: Some(parent.clone()),
            function_scope,
            ..Context::default()
        })))
    }

    pub fn ptr_eq(&self, other: &ContextRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_root(&self) -> bool {
        self.0.borrow().parent.is_none()
    }

    pub fn is_collected(&self) -> bool {
        self.0.borrow().collected
    }

    pub fn parent(&self) -> Option<ContextRef> {
        self.0.borrow().parent.clone()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_collected() {
            Err(ScriptError::ContextCleared)
        } else {
            Ok(())
        }
    }

    pub fn create_child(&self) -> Result<ContextRef> {
        self.ensure_live()?;
        Ok(ContextRef::with_parent(self, false))
    }

    /// A child that stops assignments from reaching the caller's variables.
    pub fn create_function_child(&self) -> Result<ContextRef> {
        self.ensure_live()?;
        Ok(ContextRef::with_parent(self, true))
    }

    /// Empties this context and returns its parent. The root returns itself.
    pub fn collect(&self) -> Result<ContextRef> {
        self.ensure_live()?;
        let mut ctx = self.0.borrow_mut();
        let Some(parent) = ctx.parent.clone() else {
            return Ok(self.clone());
        };
        tracing::trace!(
            variables = ctx.variables.len(),
            functions = ctx.functions.len(),
            commands = ctx.commands.len(),
            "context collected"
        );
        ctx.collected = true;
        ctx.variables.clear();
        ctx.constants.clear();
        ctx.functions.clear();
        ctx.commands.clear();
        ctx.blocks.clear();
        Ok(parent)
    }

    /// The innermost context that declares `name` as `kind`.
    pub fn lookup(&self, name: &str, kind: ObjectKind) -> Result<Option<ContextRef>> {
        self.ensure_live()?;
        let key = key(name);
        let mut current = Some(self.clone());
        while let Some(ctx) = current {
            if ctx.0.borrow().has(&key, kind) {
                return Ok(Some(ctx));
            }
            current = ctx.parent();
        }
        Ok(None)
    }

    /// Resolves `name` against every table, innermost context first.
    pub fn resolve(&self, name: &str) -> Result<Resolved> {
        self.ensure_live()?;
        let key = key(name);
        let mut current = Some(self.clone());
        while let Some(ctx) = current {
            let resolved = ctx.0.borrow().resolve_here(&key);
            if !matches!(resolved, Resolved::NotFound) {
                return Ok(resolved);
            }
            current = ctx.parent();
        }
        Ok(Resolved::NotFound)
    }

    fn get(&self, name: &str, kind: ObjectKind) -> Result<Resolved> {
        match self.lookup(name, kind)? {
            Some(ctx) => Ok(ctx.0.borrow().fetch(&key(name), kind)),
            None => Err(ScriptError::Undefined(name.to_string())),
        }
    }

    /// Reads a constant or variable, whichever the chain defines first.
    pub fn get_variable(&self, name: &str) -> Result<Value> {
        self.ensure_live()?;
        let key = key(name);
        let mut current = Some(self.clone());
        while let Some(ctx) = current {
            {
                let inner = ctx.0.borrow();
                if let Some(value) = inner.constants.get(&key).or_else(|| inner.variables.get(&key)) {
                    return Ok(value.clone());
                }
            }
            current = ctx.parent();
        }
        Err(ScriptError::Undefined(name.to_string()))
    }

    pub fn get_function(&self, name: &str) -> Result<Callable> {
        match self.get(name, ObjectKind::Function)? {
            Resolved::Function(f) => Ok(f),
            _ => Err(ScriptError::Undefined(name.to_string())),
        }
    }

    pub fn get_command(&self, name: &str) -> Result<Callable> {
        match self.get(name, ObjectKind::Command)? {
            Resolved::Command(c) => Ok(c),
            _ => Err(ScriptError::Undefined(name.to_string())),
        }
    }

    pub fn get_block(&self, name: &str) -> Result<BlockCreator> {
        match self.get(name, ObjectKind::Block)? {
            Resolved::Block(b) => Ok(b),
            _ => Err(ScriptError::Undefined(name.to_string())),
        }
    }

    /// Assigns to the context that declared `name`, or declares it here.
    /// The search for a declaring context stops at the nearest function scope.
    pub fn set_variable(&self, name: &str, value: Value) -> Result<()> {
        self.ensure_live()?;
        if self.lookup(name, ObjectKind::Constant)?.is_some() {
            return Err(ScriptError::ConstantChange(name.to_string()));
        }
        let key = key(name);
        let mut current = Some(self.clone());
        while let Some(ctx) = current {
            let (declared, boundary) = {
                let inner = ctx.0.borrow();
                (inner.variables.contains_key(&key), inner.function_scope)
            };
            if declared {
                tracing::trace!(name, "variable set");
                ctx.0.borrow_mut().variables.insert(key, value);
                return Ok(());
            }
            if boundary {
                break;
            }
            current = ctx.parent();
        }
        tracing::trace!(name, "variable declared");
        self.0.borrow_mut().variables.insert(key, value);
        Ok(())
    }

    /// Declares `name` in this context, shadowing any outer variable.
    pub fn declare_variable(&self, name: &str, value: Value) -> Result<()> {
        self.ensure_live()?;
        if self.lookup(name, ObjectKind::Constant)?.is_some() {
            return Err(ScriptError::AlreadyDefined {
                name: name.to_string(),
                kind: "constant",
                new_kind: "variable",
            });
        }
        self.0.borrow_mut().variables.insert(key(name), value);
        Ok(())
    }

    /// True when `name` is a variable declared in this very context.
    pub fn declares_variable(&self, name: &str) -> bool {
        self.0.borrow().variables.contains_key(&key(name))
    }

    /// Constants are write-once across the whole chain.
    pub fn set_constant(&self, name: &str, value: Value) -> Result<()> {
        self.ensure_live()?;
        if self.lookup(name, ObjectKind::Variable)?.is_some() {
            return Err(ScriptError::AlreadyDefined {
                name: name.to_string(),
                kind: "variable",
                new_kind: "constant",
            });
        }
        if self.lookup(name, ObjectKind::Constant)?.is_some() {
            return Err(ScriptError::ConstantChange(name.to_string()));
        }
        tracing::trace!(name, "constant declared");
        self.0.borrow_mut().constants.insert(key(name), value);
        Ok(())
    }

    fn set_callable(&self, name: &str, kind: ObjectKind, callable: Callable) -> Result<()> {
        let target = self.lookup(name, kind)?.unwrap_or_else(|| self.clone());
        tracing::trace!(name, kind = kind.describe(), "callable set");
        let mut inner = target.0.borrow_mut();
        let table = match kind {
            ObjectKind::Command => &mut inner.commands,
            _ => &mut inner.functions,
        };
        table.insert(key(name), callable);
        Ok(())
    }

    pub fn set_function(&self, name: &str, callable: Callable) -> Result<()> {
        self.set_callable(name, ObjectKind::Function, callable)
    }

    pub fn set_command(&self, name: &str, callable: Callable) -> Result<()> {
        self.set_callable(name, ObjectKind::Command, callable)
    }

    /// Installs a command visible only from this context and its children.
    pub fn declare_command(&self, name: &str, callable: Callable) -> Result<()> {
        self.ensure_live()?;
        self.0.borrow_mut().commands.insert(key(name), callable);
        Ok(())
    }

    /// Installs a function visible only from this context and its children.
    pub fn declare_function(&self, name: &str, callable: Callable) -> Result<()> {
        self.ensure_live()?;
        self.0.borrow_mut().functions.insert(key(name), callable);
        Ok(())
    }

    /// The outermost context of the chain.
    pub fn global(&self) -> ContextRef {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Merges a builtin library into the global function table.
    pub fn add_library(&self, library: &[(&str, BuiltinFn)]) -> Result<()> {
        let global = self.global();
        global.ensure_live()?;
        let mut inner = global.0.borrow_mut();
        for (name, func) in library {
            inner.functions.insert(key(name), Callable::Builtin(*func));
        }
        Ok(())
    }

    /// Merges builtin commands into the global command table.
    pub fn add_commands(&self, commands: &[(&str, BuiltinFn)]) -> Result<()> {
        let global = self.global();
        global.ensure_live()?;
        let mut inner = global.0.borrow_mut();
        for (name, func) in commands {
            inner.commands.insert(key(name), Callable::Builtin(*func));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ContextRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.borrow();
        f.debug_struct("Context")
            .field("variables", &inner.variables)
            .field("constants", &inner.constants)
            .field("collected", &inner.collected)
            .field("has_parent", &inner.parent.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use pretty_assertions::assert_eq;

    fn noop(_: &mut Frame<'_>) -> Result<()> {
        Ok(())
    }

    #[test]
    fn lookup_walks_outward() {
        let root = ContextRef::root();
        root.set_variable("x$", Value::Int(1)).unwrap();
        let child = root.create_child().unwrap();
        let grandchild = child.create_child().unwrap();

        assert_eq!(grandchild.get_variable("X$").unwrap(), Value::Int(1));
        let owner = grandchild.lookup("x$", ObjectKind::Variable).unwrap().unwrap();
        assert!(owner.ptr_eq(&root));
    }

    #[test]
    fn set_mutates_declaring_context() {
        let root = ContextRef::root();
        root.set_variable("x$", Value::Int(1)).unwrap();
        let child = root.create_child().unwrap();
        child.set_variable("x$", Value::Int(2)).unwrap();
        child.set_variable("y$", Value::Int(3)).unwrap();

        assert_eq!(root.get_variable("x$").unwrap(), Value::Int(2));
        assert!(root.get_variable("y$").is_err());
        assert!(child.declares_variable("y$"));
    }

    #[test]
    fn function_scope_stops_assignment() {
        let root = ContextRef::root();
        root.set_variable("x$", Value::Int(1)).unwrap();
        let func = root.create_function_child().unwrap();
        let inner = func.create_child().unwrap();
        inner.set_variable("x$", Value::Int(5)).unwrap();

        assert_eq!(root.get_variable("x$").unwrap(), Value::Int(1));
        assert_eq!(inner.get_variable("x$").unwrap(), Value::Int(5));
        assert!(func.declares_variable("x$"));
    }

    #[test]
    fn constants_are_write_once_at_every_depth() {
        let root = ContextRef::root();
        root.set_constant("@X", Value::Int(1)).unwrap();
        let child = root.create_child().unwrap().create_function_child().unwrap();

        assert!(matches!(
            child.set_variable("@x", Value::Int(2)),
            Err(ScriptError::ConstantChange(_))
        ));
        assert!(matches!(
            child.set_constant("@X", Value::Int(2)),
            Err(ScriptError::ConstantChange(_))
        ));
        assert!(matches!(
            child.declare_variable("@X", Value::Int(2)),
            Err(ScriptError::AlreadyDefined { .. })
        ));
        assert_eq!(child.get_variable("@X").unwrap(), Value::Int(1));
    }

    #[test]
    fn variable_cannot_become_constant() {
        let root = ContextRef::root();
        root.set_variable("a$", Value::Int(1)).unwrap();
        let err = root.create_child().unwrap().set_constant("a$", Value::Int(1)).unwrap_err();
        assert!(matches!(err, ScriptError::AlreadyDefined { kind: "variable", .. }));
    }

    #[test]
    fn collect_clears_and_returns_parent() {
        let root = ContextRef::root();
        let child = root.create_child().unwrap();
        child.set_variable("tmp$", Value::Int(1)).unwrap();

        let parent = child.collect().unwrap();
        assert!(parent.ptr_eq(&root));
        assert!(child.is_collected());
        assert!(matches!(child.get_variable("tmp$"), Err(ScriptError::ContextCleared)));
        assert!(matches!(child.create_child(), Err(ScriptError::ContextCleared)));
        assert!(matches!(child.collect(), Err(ScriptError::ContextCleared)));
    }

    #[test]
    fn collecting_root_is_a_no_op() {
        let root = ContextRef::root();
        root.set_variable("x$", Value::Int(1)).unwrap();
        let same = root.collect().unwrap();
        assert!(same.ptr_eq(&root));
        assert!(!root.is_collected());
        assert_eq!(root.get_variable("x$").unwrap(), Value::Int(1));
    }

    #[test]
    fn resolve_reports_kind() {
        let root = ContextRef::root();
        root.add_library(&[("Abs", noop)]).unwrap();
        root.add_commands(&[("LET", noop)]).unwrap();
        let child = root.create_child().unwrap();
        child.set_variable("v$", Value::Int(0)).unwrap();

        assert_eq!(child.resolve("abs").unwrap().kind(), Some(ObjectKind::Function));
        assert_eq!(child.resolve("let").unwrap().kind(), Some(ObjectKind::Command));
        assert_eq!(child.resolve("v$").unwrap().kind(), Some(ObjectKind::Variable));
        assert_eq!(child.resolve("nope").unwrap().kind(), None);
    }

    #[test]
    fn preloaded_root_has_blocks_and_commands() {
        let root = ContextRef::root_with(crate::blocks::BLOCKS, &[("LET", noop)]);
        let child = root.create_child().unwrap();
        assert_eq!(child.resolve("While").unwrap().kind(), Some(ObjectKind::Block));
        assert_eq!(child.resolve("let").unwrap().kind(), Some(ObjectKind::Command));
        assert!(root.is_root());
    }

    #[test]
    fn local_commands_disappear_with_their_context() {
        let root = ContextRef::root();
        let child = root.create_child().unwrap();
        child.declare_command("return", Callable::Builtin(noop)).unwrap();
        assert!(child.get_command("RETURN").is_ok());
        child.collect().unwrap();
        assert!(matches!(root.get_command("return"), Err(ScriptError::Undefined(_))));
    }
}
