//! Operator tables and reducers.
//!
//! Operators are resolved to an enum once during tokenization; reducers are a
//! `match` on that enum rather than a lookup by symbol.

use crate::error::{Result, ScriptError};
use crate::tokenizer::Token;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    StrictEq,
    NotEq,
    StrictNotEq,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Pos,
    Neg,
    Not,
    BitNot,
}

impl BinaryOp {
    pub fn from_token(token: &Token) -> Option<BinaryOp> {
        let op = match token {
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
            Token::Mod => BinaryOp::Mod,
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
            Token::Shl => BinaryOp::Shl,
            Token::Shr => BinaryOp::Shr,
            Token::Less => BinaryOp::Less,
            Token::LessEq => BinaryOp::LessEq,
            Token::Greater => BinaryOp::Greater,
            Token::GreaterEq => BinaryOp::GreaterEq,
            Token::Eq => BinaryOp::Eq,
            Token::StrictEq => BinaryOp::StrictEq,
            Token::NotEq => BinaryOp::NotEq,
            Token::StrictNotEq => BinaryOp::StrictNotEq,
            Token::Amp => BinaryOp::BitAnd,
            Token::Caret => BinaryOp::BitXor,
            Token::Pipe => BinaryOp::BitOr,
            Token::And => BinaryOp::And,
            Token::Or => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "MOD",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Eq => "=",
            BinaryOp::StrictEq => "==",
            BinaryOp::NotEq => "<>",
            BinaryOp::StrictNotEq => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    /// Lower binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 0,
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Shl | BinaryOp::Shr => 2,
            BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => 3,
            BinaryOp::Eq | BinaryOp::StrictEq | BinaryOp::NotEq | BinaryOp::StrictNotEq => 4,
            BinaryOp::BitAnd => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitOr => 7,
            BinaryOp::And => 8,
            BinaryOp::Or => 9,
        }
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// Applies a non-short-circuit operator to two evaluated operands.
    pub fn apply(self, left: &Value, right: &Value) -> Result<Value> {
        let result = if left.is_str() || right.is_str() {
            self.apply_text(left, right)
        } else {
            self.apply_numeric(left, right)
        };
        match result {
            Err(ScriptError::Conversion { .. }) | Err(ScriptError::Argument(_)) => {
                Err(ScriptError::OperatorTypes {
                    op: self.symbol(),
                    left: left.type_name(),
                    right: right.type_name(),
                })
            }
            other => other.map(Value::normalized),
        }
    }

    fn apply_text(self, left: &Value, right: &Value) -> Result<Value> {
        let (l, r) = (left.to_text(), right.to_text());
        match self {
            BinaryOp::Add => Ok(Value::Str(l + &r)),
            BinaryOp::Eq => Ok(Value::Bool(eq_ignore_case(&l, &r))),
            BinaryOp::StrictEq => Ok(Value::Bool(l == r)),
            BinaryOp::NotEq => Ok(Value::Bool(!eq_ignore_case(&l, &r))),
            BinaryOp::StrictNotEq => Ok(Value::Bool(l != r)),
            BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
                Err(ScriptError::Argument(format!("'{}' does not compare strings", self.symbol())))
            }
            _ => self.apply_numeric(left, right),
        }
    }

    fn apply_numeric(self, left: &Value, right: &Value) -> Result<Value> {
        let value = match self {
            BinaryOp::Mul => Value::from(left.to_f64()? * right.to_f64()?),
            BinaryOp::Div => {
                let (l, r) = (left.to_f64()?, right.to_f64()?);
                if r == 0.0 {
                    return Err(ScriptError::DivideByZero);
                }
                Value::from(l / r)
            }
            BinaryOp::Mod => {
                let (l, r) = (left.to_i64()?, right.to_i64()?);
                if r == 0 {
                    return Err(ScriptError::DivideByZero);
                }
                Value::Int(l.wrapping_rem(r))
            }
            BinaryOp::Shl => Value::Int(left.to_i64()?.wrapping_shl(right.to_i64()? as u32)),
            BinaryOp::Shr => Value::Int(left.to_i64()?.wrapping_shr(right.to_i64()? as u32)),
            BinaryOp::Add => Value::from(left.to_f64()? + right.to_f64()?),
            BinaryOp::Sub => Value::from(left.to_f64()? - right.to_f64()?),
            BinaryOp::Less => Value::Bool(left.to_f64()? < right.to_f64()?),
            BinaryOp::LessEq => Value::Bool(left.to_f64()? <= right.to_f64()?),
            BinaryOp::Greater => Value::Bool(left.to_f64()? > right.to_f64()?),
            BinaryOp::GreaterEq => Value::Bool(left.to_f64()? >= right.to_f64()?),
            BinaryOp::Eq | BinaryOp::StrictEq => Value::Bool(left.to_f64()? == right.to_f64()?),
            BinaryOp::NotEq | BinaryOp::StrictNotEq => {
                Value::Bool(left.to_f64()? != right.to_f64()?)
            }
            BinaryOp::BitAnd => Value::from_u64(left.to_u64()? & right.to_u64()?),
            BinaryOp::BitXor => Value::from_u64(left.to_u64()? ^ right.to_u64()?),
            BinaryOp::BitOr => Value::from_u64(left.to_u64()? | right.to_u64()?),
            BinaryOp::And => Value::Bool(left.to_bool()? && right.to_bool()?),
            BinaryOp::Or => Value::Bool(left.to_bool()? || right.to_bool()?),
        };
        Ok(value)
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

impl UnaryOp {
    pub fn from_token(token: &Token) -> Option<UnaryOp> {
        match token {
            Token::Plus => Some(UnaryOp::Pos),
            Token::Minus => Some(UnaryOp::Neg),
            Token::Not => Some(UnaryOp::Not),
            Token::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Pos => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "NOT",
            UnaryOp::BitNot => "~",
        }
    }

    /// Every builtin unary operator takes its operand from the right.
    pub fn side(self) -> OperandSide {
        OperandSide::Right
    }

    pub fn apply(self, operand: &Value) -> Result<Value> {
        let result = match self {
            UnaryOp::Pos => operand.to_f64().map(Value::from),
            UnaryOp::Neg => operand.to_f64().map(|d| Value::from(-d)),
            UnaryOp::Not => operand.to_bool().map(|b| Value::Bool(!b)),
            UnaryOp::BitNot => operand.to_u64().map(|n| Value::from_u64(!n)),
        };
        result.map_err(|_| ScriptError::UnaryTypes {
            op: self.symbol(),
            operand: operand.type_name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn precedence_table() {
        assert!(BinaryOp::Mul.precedence() < BinaryOp::Add.precedence());
        assert!(BinaryOp::Add.precedence() < BinaryOp::Shl.precedence());
        assert!(BinaryOp::Less.precedence() < BinaryOp::Eq.precedence());
        assert!(BinaryOp::BitAnd.precedence() < BinaryOp::BitXor.precedence());
        assert!(BinaryOp::BitOr.precedence() < BinaryOp::And.precedence());
        assert_eq!(BinaryOp::Or.precedence(), 9);
    }

    #[test]
    fn string_equality_case_rules() {
        let (upper, lower) = (Value::from("ABC"), Value::from("abc"));
        assert_eq!(BinaryOp::Eq.apply(&upper, &lower).unwrap(), Value::Bool(true));
        assert_eq!(BinaryOp::StrictEq.apply(&upper, &lower).unwrap(), Value::Bool(false));
        assert_eq!(BinaryOp::NotEq.apply(&upper, &lower).unwrap(), Value::Bool(false));
        assert_eq!(BinaryOp::StrictNotEq.apply(&upper, &lower).unwrap(), Value::Bool(true));
        assert_eq!(BinaryOp::NotEq.apply(&upper, &Value::from("abd")).unwrap(), Value::Bool(true));
    }

    #[test]
    fn concatenation_uses_display_of_numbers() {
        let result = BinaryOp::Add.apply(&Value::from("n="), &Value::Double(1.5)).unwrap();
        assert_eq!(result, Value::from("n=1.5"));
    }

    #[test]
    fn numeric_strings_still_multiply() {
        assert_eq!(BinaryOp::Mul.apply(&Value::from("3"), &Value::Int(2)).unwrap(), Value::Int(6));
    }

    #[test]
    fn bad_operands_report_both_types() {
        let err = BinaryOp::Mul.apply(&Value::from("abc"), &Value::Int(2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "operator '*' cannot be applied to types string and integer"
        );
        let err = BinaryOp::Less.apply(&Value::Array(vec![]), &Value::Int(2)).unwrap_err();
        assert!(matches!(err, ScriptError::OperatorTypes { left: "array", .. }));
    }

    #[test]
    fn division_by_zero_is_distinct() {
        let err = BinaryOp::Div.apply(&Value::Int(1), &Value::Int(0)).unwrap_err();
        assert!(matches!(err, ScriptError::DivideByZero));
        let err = BinaryOp::Mod.apply(&Value::Int(1), &Value::Int(0)).unwrap_err();
        assert!(matches!(err, ScriptError::DivideByZero));
    }

    #[test]
    fn integer_and_bitwise_reducers() {
        assert_eq!(BinaryOp::Mod.apply(&Value::Int(7), &Value::Int(3)).unwrap(), Value::Int(1));
        assert_eq!(BinaryOp::Shl.apply(&Value::Int(1), &Value::Int(4)).unwrap(), Value::Int(16));
        assert_eq!(BinaryOp::BitOr.apply(&Value::Int(5), &Value::Int(2)).unwrap(), Value::Int(7));
        assert_eq!(BinaryOp::BitXor.apply(&Value::Int(6), &Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(BinaryOp::Div.apply(&Value::Int(7), &Value::Int(2)).unwrap(), Value::Double(3.5));
    }

    #[test]
    fn unary_reducers() {
        assert_eq!(UnaryOp::Neg.apply(&Value::Int(3)).unwrap(), Value::Int(-3));
        assert_eq!(UnaryOp::Not.apply(&Value::Bool(false)).unwrap(), Value::Bool(true));
        assert!(matches!(
            UnaryOp::Neg.apply(&Value::from("x")),
            Err(ScriptError::UnaryTypes { op: "-", operand: "string" })
        ));
    }
}
