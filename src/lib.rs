/*
 * tbasic - An embeddable BASIC-style script interpreter
 *
 * === Overview ===
 * Scripts are plain text, one statement per line. A trailing `_` continues a
 * statement on the next physical line and `;` starts a comment. Each line is
 * either a block header (`IF`, `WHILE`, `DO`, `FOR`, `SELECT`), a command
 * (`LET`, `DIM`, `CONST`, `BREAK`, `EXIT`, `SLEEP`, `#include`, ...) or an
 * expression. `FUNCTION ... END FUNCTION` declarations are pulled out of the
 * script before it runs, so they can be called from anywhere in it.
 *
 * === Architecture ===
 *
 * 1.  **Line scanning (`line`):**
 * The scanner joins continuations, drops comments and blank lines, keeps the
 * physical line number of every statement and rewrites `name$ = ...` into
 * `LET name$ = ...`.
 *
 * 2.  **Blocks (`blocks`):**
 * Block headers are looked up by name in the scope chain, so a block keyword is
 * just another registered object. Each block measures itself from the line list
 * and runs its body in a child scope that is discarded afterwards.
 *
 * 3.  **Expressions (`tokenizer`, `operators`, `evaluator`):**
 * Expressions are lexed with `logos` into a flat item list. Binary operators
 * are reduced through a priority queue ordered by precedence and then by
 * position, and operands are evaluated lazily so `AND`/`OR` short-circuit.
 *
 * 4.  **Scopes (`context`):**
 * Contexts form a parent-linked chain with separate tables for variables,
 * constants, functions, commands and blocks. Names are case-insensitive.
 *
 * 5.  **Calls (`frame`, `libraries`):**
 * Builtin commands, builtin functions and user functions share one calling
 * convention: a `Frame` whose argument 0 is the callee name.
 *
 * 6.  **Errors (`error`):**
 * A single `ScriptError` enum built with `thiserror`. Errors raised while a
 * line runs are wrapped with that line, and `report()` renders the chain like
 * a stack trace.
 */

pub mod blocks;
pub mod config;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod executer;
pub mod frame;
pub mod libraries;
pub mod line;
pub mod operators;
pub mod stack;
pub mod tokenizer;
pub mod value;

pub use config::Config;
pub use error::{Result, ScriptError};
pub use executer::{needs_more_input, Executer};
pub use value::Value;
