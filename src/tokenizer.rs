//! Lexical tokens of the expression language.

use logos::Logos;

/// Reasons a slice of input cannot become a token.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LexError {
    #[default]
    InvalidToken,
    UnterminatedString,
}

fn unterminated(_: &mut logos::Lexer<Token>) -> Result<(), LexError> {
    Err(LexError::UnterminatedString)
}

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(error = LexError, skip r"[ \t\r\n\f]+")]
pub enum Token {
    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBracket,
    #[token("]")] RBracket,
    #[token(",")] Comma,

    /// Quoted literal including its quotes; decoded by the evaluator.
    #[regex(r#""([^"\\]|\\.)*""#, |lex| lex.slice().to_string())]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| lex.slice().to_string())]
    Str(String),

    #[regex(r#""([^"\\]|\\.)*"#, unterminated)]
    #[regex(r#"'([^'\\]|\\.)*"#, unterminated)]
    Unterminated,

    #[token("null", ignore(ascii_case))] Null,
    #[token("true", ignore(ascii_case))] True,
    #[token("false", ignore(ascii_case))] False,

    // Word operators
    #[token("mod", ignore(ascii_case))] Mod,
    #[token("and", ignore(ascii_case))] And,
    #[token("or", ignore(ascii_case))] Or,
    #[token("not", ignore(ascii_case))] Not,

    /// `name$` or `@name`
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*\$", |lex| lex.slice().to_string())]
    #[regex(r"@[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Variable(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice()[2..].to_string())]
    Hex(String),

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),

    #[token("<<")] Shl,
    #[token(">>")] Shr,
    #[token("<=")]
    #[token("=<")]
    LessEq,
    #[token(">=")]
    #[token("=>")]
    GreaterEq,
    #[token("<>")] NotEq,
    #[token("!=")] StrictNotEq,
    #[token("==")] StrictEq,
    #[token("=")] Eq,
    #[token("<")] Less,
    #[token(">")] Greater,
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("*")] Star,
    #[token("/")] Slash,
    #[token("&")] Amp,
    #[token("|")] Pipe,
    #[token("^")] Caret,
    #[token("~")] Tilde,
}

/// A token together with the source text it was lexed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub text: String,
}

/// Lexes a whole expression. The error carries the offending slice.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, (LexError, String)> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        match result {
            Ok(token) => tokens.push(Spanned {
                token,
                text: lexer.slice().to_string(),
            }),
            Err(e) => return Err((e, lexer.slice().to_string())),
        }
    }
    Ok(tokens)
}
