//! Expression evaluation.
//!
//! An expression is lexed into a flat list of items (literals, groups,
//! variables, calls and operators). Unary operators bind to the operand on
//! their right. Binary operators are then reduced through [`BinaryOpQueue`],
//! which yields them by precedence and, within one precedence, left to right.
//! Operands are only evaluated when an operator needs them, which is what lets
//! `AND` and `OR` skip their right-hand side.

use crate::error::{Result, ScriptError};
use crate::executer::Executer;
use crate::frame::Frame;
use crate::operators::{BinaryOp, UnaryOp};
use crate::stack::ensure_sufficient_stack;
use crate::tokenizer::{tokenize, LexError, Spanned, Token};
use crate::value::{unescape, Value};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone)]
pub enum Item {
    Value(Value),
    Group(Vec<Item>),
    Variable(VariableRef),
    Call(CallExpr),
    Unary(UnaryOp),
    Binary(BinaryOp),
}

/// `name$`, `@name` or `name$[i, j, ...]`.
#[derive(Debug, Clone)]
pub struct VariableRef {
    name: String,
    indices: Vec<Vec<Item>>,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    name: String,
    args: Vec<Vec<Item>>,
}

/// Parses a lone variable reference, as found on the left of `LET`.
pub fn parse_variable(text: &str) -> Result<VariableRef> {
    match parse(text)?.as_slice() {
        [Item::Variable(var)] => Ok(var.clone()),
        _ => Err(ScriptError::InvalidVariableName(text.trim().to_string())),
    }
}

impl VariableRef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_indices(&self) -> bool {
        !self.indices.is_empty()
    }

    pub fn evaluate_indices(&self, exec: &mut Executer) -> Result<Vec<usize>> {
        self.indices
            .iter()
            .map(|index| {
                let n = reduce(index, exec)?
                    .to_i64()
                    .map_err(|_| ScriptError::Argument("array index must be an integer".into()))?;
                usize::try_from(n).map_err(|_| ScriptError::IndexOutOfRange {
                    name: self.name.clone(),
                    index: n,
                })
            })
            .collect()
    }

    pub fn read(&self, exec: &mut Executer) -> Result<Value> {
        let indices = self.evaluate_indices(exec)?;
        let mut value = exec.context().get_variable(&self.name)?;
        for index in indices {
            value = match value {
                Value::Array(mut items) if index < items.len() => items.swap_remove(index),
                Value::Array(_) => {
                    return Err(ScriptError::IndexOutOfRange {
                        name: self.name.clone(),
                        index: index as i64,
                    })
                }
                _ => return Err(ScriptError::IndexUnavailable(self.name.clone())),
            };
        }
        Ok(value.normalized())
    }

    /// Assigns to the variable, or to one element of an existing array.
    pub fn write(&self, exec: &mut Executer, value: Value) -> Result<()> {
        let context = exec.context();
        if !self.has_indices() {
            return context.set_variable(&self.name, value);
        }
        let indices = self.evaluate_indices(exec)?;
        let mut root = context.get_variable(&self.name)?;
        let mut slot = &mut root;
        for index in indices {
            slot = match slot {
                Value::Array(items) => items.get_mut(index).ok_or_else(|| ScriptError::IndexOutOfRange {
                    name: self.name.clone(),
                    index: index as i64,
                })?,
                _ => return Err(ScriptError::IndexUnavailable(self.name.clone())),
            };
        }
        *slot = value;
        context.set_variable(&self.name, root)
    }
}

impl CallExpr {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, exec: &mut Executer) -> Result<Value> {
        let args = self
            .args
            .iter()
            .map(|arg| reduce(arg, exec))
            .collect::<Result<Vec<_>>>()?;
        let callable = exec.context().get_function(&self.name)?;
        let mut frame = Frame::from_args(exec, &self.name, args);
        callable.invoke(&mut frame)?;
        Ok(std::mem::take(&mut frame.result).normalized())
    }
}

/// An expression with its parsed form cached between evaluations.
#[derive(Debug, Clone)]
pub struct Evaluator {
    source: String,
    items: Option<Vec<Item>>,
}

impl Evaluator {
    pub fn new(source: &str) -> Self {
        Evaluator {
            source: source.trim().to_string(),
            items: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Drops the cached parse so the next evaluation starts from the text.
    pub fn reparse(&mut self) {
        self.items = None;
    }

    pub fn evaluate(&mut self, exec: &mut Executer) -> Result<Value> {
        if self.source.is_empty() {
            return Ok(Value::Int(0));
        }
        let items = match self.items.take() {
            Some(items) => items,
            None => parse(&self.source)?,
        };
        let result = reduce(&items, exec);
        self.items = Some(items);
        result
    }

    pub fn evaluate_bool(&mut self, exec: &mut Executer) -> Result<bool> {
        self.evaluate(exec)?.to_bool()
    }
}

/// One-shot evaluation of `source` in the executer's current context.
pub fn evaluate(source: &str, exec: &mut Executer) -> Result<Value> {
    Evaluator::new(source).evaluate(exec)
}

/// Lexes and parses an expression into its flat item list.
pub fn parse(source: &str) -> Result<Vec<Item>> {
    let tokens = tokenize(source).map_err(|(err, slice)| match err {
        LexError::UnterminatedString => ScriptError::UnterminatedString(slice),
        LexError::InvalidToken => ScriptError::InvalidToken(slice),
    })?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let items = parser.sequence()?;
    match parser.peek() {
        None => Ok(items),
        Some(stray) => Err(ScriptError::InvalidToken(stray.text.clone())),
    }
}

struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Spanned> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Spanned> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        match self.next() {
            Some(s) if s.token == token => Ok(()),
            Some(s) => Err(ScriptError::InvalidExpression(format!("expected '{}' but found '{}'", what, s.text))),
            None => Err(ScriptError::InvalidExpression(format!("expected '{}'", what))),
        }
    }

    /// Items up to the next `)`, `]`, `,` or the end of input.
    fn sequence(&mut self) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = Vec::new();
        while let Some(spanned) = self.peek() {
            if matches!(spanned.token, Token::RParen | Token::RBracket | Token::Comma) {
                break;
            }
            self.pos += 1;
            let operand_expected = matches!(items.last(), None | Some(Item::Binary(_)) | Some(Item::Unary(_)));
            let item = match &spanned.token {
                Token::LParen => {
                    let inner = self.sequence()?;
                    self.expect(Token::RParen, ")")?;
                    if inner.is_empty() {
                        return Err(ScriptError::InvalidExpression("empty group '()'".into()));
                    }
                    Item::Group(inner)
                }
                Token::Str(quoted) => Item::Value(Value::Str(unescape(&quoted[1..quoted.len() - 1])?)),
                Token::Null => Item::Value(Value::Null),
                Token::True => Item::Value(Value::Bool(true)),
                Token::False => Item::Value(Value::Bool(false)),
                Token::Number(text) => Item::Value(parse_number(text)?),
                Token::Hex(digits) => {
                    let n = u64::from_str_radix(digits, 16)
                        .map_err(|_| ScriptError::InvalidToken(spanned.text.clone()))?;
                    Item::Value(Value::from_u64(n))
                }
                Token::Variable(name) => Item::Variable(VariableRef {
                    name: name.clone(),
                    indices: self.indices()?,
                }),
                Token::Ident(name) => match self.peek() {
                    Some(Spanned { token: Token::LParen, .. }) => {
                        self.pos += 1;
                        Item::Call(CallExpr {
                            name: name.clone(),
                            args: self.arguments()?,
                        })
                    }
                    _ => return Err(ScriptError::InvalidToken(name.clone())),
                },
                Token::Plus | Token::Minus if operand_expected => {
                    Item::Unary(UnaryOp::from_token(&spanned.token).ok_or_else(|| unexpected(spanned))?)
                }
                Token::Not | Token::Tilde => {
                    Item::Unary(UnaryOp::from_token(&spanned.token).ok_or_else(|| unexpected(spanned))?)
                }
                other => Item::Binary(BinaryOp::from_token(other).ok_or_else(|| unexpected(spanned))?),
            };
            items.push(item);
        }
        Ok(items)
    }

    fn indices(&mut self) -> Result<Vec<Vec<Item>>> {
        if !matches!(self.peek(), Some(Spanned { token: Token::LBracket, .. })) {
            return Ok(Vec::new());
        }
        self.pos += 1;
        let mut indices = Vec::new();
        loop {
            let index = self.sequence()?;
            if index.is_empty() {
                return Err(ScriptError::NoIndexSpecified);
            }
            indices.push(index);
            match self.next() {
                Some(Spanned { token: Token::Comma, .. }) => continue,
                Some(Spanned { token: Token::RBracket, .. }) => return Ok(indices),
                Some(s) => return Err(unexpected(s)),
                None => return Err(ScriptError::InvalidExpression("expected ']'".into())),
            }
        }
    }

    fn arguments(&mut self) -> Result<Vec<Vec<Item>>> {
        if matches!(self.peek(), Some(Spanned { token: Token::RParen, .. })) {
            self.pos += 1;
            return Ok(Vec::new());
        }
        let mut args = Vec::new();
        loop {
            let arg = self.sequence()?;
            if arg.is_empty() {
                return Err(ScriptError::InvalidExpression("empty function argument".into()));
            }
            args.push(arg);
            match self.next() {
                Some(Spanned { token: Token::Comma, .. }) => continue,
                Some(Spanned { token: Token::RParen, .. }) => return Ok(args),
                Some(s) => return Err(unexpected(s)),
                None => return Err(ScriptError::InvalidExpression("expected ')'".into())),
            }
        }
    }
}

fn unexpected(spanned: &Spanned) -> ScriptError {
    ScriptError::InvalidToken(spanned.text.clone())
}

fn parse_number(text: &str) -> Result<Value> {
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Int(n));
    }
    text.parse::<f64>()
        .map(Value::from_f64)
        .map_err(|_| ScriptError::InvalidToken(text.to_string()))
}

/// Binary operator positions ordered by precedence rank, then position.
pub struct BinaryOpQueue {
    heap: BinaryHeap<Reverse<(u8, usize)>>,
}

impl BinaryOpQueue {
    pub fn new(ops: &[BinaryOp]) -> Self {
        BinaryOpQueue {
            heap: ops
                .iter()
                .enumerate()
                .map(|(pos, op)| Reverse((op.precedence(), pos)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Iterator for BinaryOpQueue {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        self.heap.pop().map(|Reverse((_, pos))| pos)
    }
}

/// An operand with the unary operators written in front of it.
struct Operand<'i> {
    unaries: Vec<UnaryOp>,
    item: &'i Item,
}

impl Operand<'_> {
    fn evaluate(&self, exec: &mut Executer) -> Result<Value> {
        let mut value = evaluate_item(self.item, exec)?;
        for op in self.unaries.iter().rev() {
            value = op.apply(&value)?;
        }
        Ok(value)
    }
}

enum Slot<'i> {
    Pending(Operand<'i>),
    Ready(Value),
    Consumed,
}

impl Slot<'_> {
    fn force(&mut self, exec: &mut Executer) -> Result<Value> {
        if let Slot::Pending(operand) = self {
            let value = operand.evaluate(exec)?;
            *self = Slot::Ready(value);
        }
        match self {
            Slot::Ready(value) => Ok(value.clone()),
            _ => Err(ScriptError::InvalidExpression("operand used twice".into())),
        }
    }
}

fn evaluate_item(item: &Item, exec: &mut Executer) -> Result<Value> {
    match item {
        Item::Value(value) => Ok(value.clone()),
        Item::Group(items) => ensure_sufficient_stack(|| reduce(items, exec)),
        Item::Variable(var) => var.read(exec),
        Item::Call(call) => call.call(exec),
        Item::Unary(op) => Err(ScriptError::InvalidExpression(format!("'{}' has no operand", op.symbol()))),
        Item::Binary(op) => Err(ScriptError::InvalidExpression(format!("'{}' has no operands", op.symbol()))),
    }
}

/// Splits the items into operands and the binary operators between them.
fn layout(items: &[Item]) -> Result<(Vec<Operand<'_>>, Vec<BinaryOp>)> {
    let mut operands = Vec::new();
    let mut ops = Vec::new();
    let mut unaries = Vec::new();
    let mut expect_operand = true;

    for item in items {
        match item {
            Item::Unary(op) => {
                if !expect_operand {
                    return Err(ScriptError::InvalidExpression("missing binary operator".into()));
                }
                unaries.push(*op);
            }
            Item::Binary(op) => {
                if expect_operand {
                    let reason = if operands.is_empty() && unaries.is_empty() {
                        "expression cannot begin with a binary operation".to_string()
                    } else {
                        format!("missing operand before '{}'", op.symbol())
                    };
                    return Err(ScriptError::InvalidExpression(reason));
                }
                ops.push(*op);
                expect_operand = true;
            }
            operand => {
                if !expect_operand {
                    return Err(ScriptError::InvalidExpression("missing binary operator".into()));
                }
                operands.push(Operand {
                    unaries: std::mem::take(&mut unaries),
                    item: operand,
                });
                expect_operand = false;
            }
        }
    }
    if expect_operand {
        return Err(ScriptError::InvalidExpression(
            "expression cannot end in a binary operation".into(),
        ));
    }
    Ok((operands, ops))
}

fn reduce(items: &[Item], exec: &mut Executer) -> Result<Value> {
    if items.is_empty() {
        return Ok(Value::Int(0));
    }
    let (operands, ops) = layout(items)?;
    let mut slots: Vec<Slot<'_>> = operands.into_iter().map(Slot::Pending).collect();

    for index in BinaryOpQueue::new(&ops) {
        let op = ops[index];
        let left = (0..=index)
            .rev()
            .find(|&i| !matches!(slots[i], Slot::Consumed))
            .ok_or_else(|| ScriptError::InvalidExpression(format!("'{}' has no left operand", op.symbol())))?;
        let right = index + 1;

        let lhs = slots[left].force(exec)?;
        let result = match op {
            BinaryOp::And | BinaryOp::Or => match lhs.to_bool() {
                Ok(false) if op == BinaryOp::And => Value::Bool(false),
                Ok(true) if op == BinaryOp::Or => Value::Bool(true),
                _ => {
                    let rhs = slots[right].force(exec)?;
                    op.apply(&lhs, &rhs)?
                }
            },
            _ => {
                let rhs = slots[right].force(exec)?;
                op.apply(&lhs, &rhs)?
            }
        };
        slots[left] = Slot::Ready(result);
        slots[right] = Slot::Consumed;
    }

    slots[0].force(exec).map(Value::normalized)
}
