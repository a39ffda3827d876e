use std::fmt;
use strum_macros::Display;

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen, RightParen, LeftBrace, RightBrace,
    Comma, Dot, Minus, Plus, Semicolon, Slash, Star,

    // One or two character tokens.
    Bang, BangEqual,
    Equal, EqualEqual,
    Greater, GreaterEqual,
    Less, LessEqual,

    // Literals.
    Identifier, String, Number,

    // Keywords.
    And, Class, Else, False, Fun, For, If, Nil, Or,
    Print, Return, Super, This, True, Var, While,

    EOF
}

/// Decoded payload of a number or string token.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tokentype: TokenType,
    pub lexeme: String,
    pub line: usize,
    pub literal: Option<Literal>,
}

impl Token {
    pub fn new(tokentype: TokenType, lexeme: &str, line: usize) -> Token {
        Token {
            tokentype,
            lexeme: lexeme.to_string(),
            line,
            literal: None,
        }
    }
    pub fn with_literal(mut self, literal: Literal) -> Token {
        self.literal = Some(literal);
        self
    }
    pub fn is(&self, tokentype: TokenType) -> bool {
        self.tokentype == tokentype
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.literal {
            None => write!(f, "{:>4} {} '{}'", self.line, self.tokentype, self.lexeme),
            Some(Literal::Number(x)) => {
                write!(f, "{:>4} {} '{}' {}", self.line, self.tokentype, self.lexeme, x)
            }
            Some(Literal::String(x)) => {
                write!(f, "{:>4} {} '{}' \"{}\"", self.line, self.tokentype, self.lexeme, x)
            }
        }
    }
}
