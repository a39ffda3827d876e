use crate::token::{Literal, Token, TokenType};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("error: [line {line}] {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

// Note: current becomes self.iter.peek()?.0
pub struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
}

/// Scans the whole source. Errors are collected rather than aborting, so the
/// token stream is best-effort and always ends with `EOF`.
pub fn scan_tokens(source: &str) -> (Vec<Token>, Vec<ScanError>) {
    let mut scanner = Scanner::new(source);
    let mut tokens: Vec<Token> = Vec::new();
    let mut errors: Vec<ScanError> = Vec::new();
    loop {
        match scanner.next_token() {
            Ok(token) => {
                let at_end = token.is(TokenType::EOF);
                tokens.push(token);
                if at_end {
                    break;
                }
            }
            Err(e) => errors.push(e),
        }
    }
    (tokens, errors)
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Scanner<'a> {
        Scanner {
            source,
            iter: source.char_indices().peekable(),
            start: 0,
            line: 1,
        }
    }
    /// Returns the next token. Once the input is exhausted every call yields
    /// an `EOF` token on the final line.
    pub fn next_token(&mut self) -> Result<Token, ScanError> {
        while let Some((idx, _)) = self.iter.peek() {
            self.start = *idx;
            if let Some(token) = self.scan_token()? {
                return Ok(token);
            }
        }
        self.start = self.source.len();
        Ok(Token::new(TokenType::EOF, "", self.line))
    }
    fn scan_token(&mut self) -> Result<Option<Token>, ScanError> {
        let c = match self.iter.next() {
            Some((_, c)) => c,
            None => return Ok(None),
        };
        match c {
            '(' => Ok(Some(self.token(TokenType::LeftParen))),
            ')' => Ok(Some(self.token(TokenType::RightParen))),
            '{' => Ok(Some(self.token(TokenType::LeftBrace))),
            '}' => Ok(Some(self.token(TokenType::RightBrace))),
            ',' => Ok(Some(self.token(TokenType::Comma))),
            '.' => Ok(Some(self.token(TokenType::Dot))),
            '-' => Ok(Some(self.token(TokenType::Minus))),
            '+' => Ok(Some(self.token(TokenType::Plus))),
            ';' => Ok(Some(self.token(TokenType::Semicolon))),
            '*' => Ok(Some(self.token(TokenType::Star))),
            '!' => Ok(Some(self.either('=', TokenType::BangEqual, TokenType::Bang))),
            '=' => Ok(Some(self.either('=', TokenType::EqualEqual, TokenType::Equal))),
            '<' => Ok(Some(self.either('=', TokenType::LessEqual, TokenType::Less))),
            '>' => Ok(Some(self.either('=', TokenType::GreaterEqual, TokenType::Greater))),
            '/' => {
                if self.next_if('/') {
                    while let Some((_, c)) = self.iter.peek() {
                        if *c == '\n' {
                            break;
                        }
                        self.iter.next();
                    }
                    Ok(None)
                } else {
                    Ok(Some(self.token(TokenType::Slash)))
                }
            }
            ' ' | '\r' | '\t' => Ok(None),
            '\n' => {
                self.line += 1;
                Ok(None)
            }
            '"' => self.string().map(Some),
            '0'..='9' => self.number().map(Some),
            'a'..='z' | 'A'..='Z' | '_' => Ok(Some(self.identifier())),
            _ => Err(self.error(format!("Unexpected character '{}'.", c))),
        }
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, token_type: TokenType) -> Token {
        let current = self.current();
        Token::new(token_type, &self.source[self.start..current], self.line)
    }
    fn either(&mut self, expected: char, matched: TokenType, otherwise: TokenType) -> Token {
        if self.next_if(expected) {
            self.token(matched)
        } else {
            self.token(otherwise)
        }
    }
    fn next_if(&mut self, expected: char) -> bool {
        self.iter.next_if(|(_, c)| *c == expected).is_some()
    }
    fn error(&self, message: String) -> ScanError {
        ScanError {
            line: self.line,
            message,
        }
    }
    fn skip_digits(&mut self) {
        while self.iter.next_if(|(_, c)| c.is_ascii_digit()).is_some() {}
    }
    fn string(&mut self) -> Result<Token, ScanError> {
        while let Some((_, c)) = self.iter.peek() {
            match c {
                '"' => break,
                '\n' => {
                    self.line += 1;
                    self.iter.next();
                }
                _ => {
                    self.iter.next();
                }
            }
        }
        if self.iter.next().is_none() {
            return Err(self.error("Unterminated string.".to_string()));
        }
        let current = self.current();
        let value = self.source[self.start + 1..current - 1].to_string();
        Ok(self
            .token(TokenType::String)
            .with_literal(Literal::String(value)))
    }
    fn number(&mut self) -> Result<Token, ScanError> {
        self.skip_digits();

        if let Some((_, '.')) = self.iter.peek() {
            let mut lookahead = self.iter.clone();
            lookahead.next();
            if let Some((_, c)) = lookahead.peek() {
                if c.is_ascii_digit() {
                    self.iter.next();
                    self.skip_digits();
                }
            }
        }

        let current = self.current();
        let source = self.source;
        let text = &source[self.start..current];
        let value: f64 = text
            .parse()
            .map_err(|_| self.error(format!("Invalid number literal '{}'.", text)))?;
        Ok(self
            .token(TokenType::Number)
            .with_literal(Literal::Number(value)))
    }
    fn identifier(&mut self) -> Token {
        while self
            .iter
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
            .is_some()
        {}
        let current = self.current();
        match KEYWORDS.get(&self.source[self.start..current]) {
            None => self.token(TokenType::Identifier),
            Some(x) => self.token(*x),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

#[cfg(test)]
mod scanner_tests {
    use crate::scanner::{self, Scanner};
    use crate::token::{Literal, TokenType};

    fn types(source: &str) -> Vec<TokenType> {
        let (tokens, errors) = scanner::scan_tokens(source);
        assert!(errors.is_empty(), "{:?}", errors);
        tokens.iter().map(|t| t.tokentype).collect()
    }

    #[test]
    fn basic_scanner_test() {
        let (tokens, errors) = scanner::scan_tokens("x = 2");
        assert!(errors.is_empty());
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].tokentype, TokenType::Identifier);
        assert_eq!(tokens[0].lexeme, "x");
        assert_eq!(tokens[1].tokentype, TokenType::Equal);
        assert_eq!(tokens[2].tokentype, TokenType::Number);
        assert_eq!(tokens[2].literal, Some(Literal::Number(2.0)));
        assert_eq!(tokens[3].tokentype, TokenType::EOF);
    }

    #[test]
    fn number_parsing() {
        let (tokens, _) = scanner::scan_tokens("1+2.5 3.");
        assert_eq!(tokens[0].literal, Some(Literal::Number(1.0)));
        assert_eq!(tokens[1].tokentype, TokenType::Plus);
        assert_eq!(tokens[2].literal, Some(Literal::Number(2.5)));
        assert_eq!(tokens[2].lexeme, "2.5");
        // A trailing dot is not part of the number.
        assert_eq!(tokens[3].literal, Some(Literal::Number(3.0)));
        assert_eq!(tokens[4].tokentype, TokenType::Dot);
    }

    #[test]
    fn two_character_operators() {
        assert_eq!(
            types("! != = == < <= > >="),
            vec![
                TokenType::Bang,
                TokenType::BangEqual,
                TokenType::Equal,
                TokenType::EqualEqual,
                TokenType::Less,
                TokenType::LessEqual,
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            types("class classy _under fun2 while"),
            vec![
                TokenType::Class,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::Identifier,
                TokenType::While,
                TokenType::EOF,
            ]
        );
    }

    #[test]
    fn comments_and_lines() {
        let (tokens, errors) = scanner::scan_tokens("// nothing here\nprint 1; // trailing\n\nvar");
        assert!(errors.is_empty());
        assert_eq!(tokens[0].tokentype, TokenType::Print);
        assert_eq!(tokens[0].line, 2);
        assert_eq!(tokens[3].tokentype, TokenType::Var);
        assert_eq!(tokens[3].line, 4);
        assert_eq!(tokens[4].line, 4);
    }

    #[test]
    fn multiline_string() {
        let (tokens, errors) = scanner::scan_tokens("\"one\ntwo\" x");
        assert!(errors.is_empty());
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("one\ntwo".to_string()))
        );
        assert_eq!(tokens[0].lexeme, "\"one\ntwo\"");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn no_escape_processing() {
        let (tokens, _) = scanner::scan_tokens(r#""a\nb""#);
        assert_eq!(tokens[0].literal, Some(Literal::String("a\\nb".to_string())));
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (tokens, errors) = scanner::scan_tokens("var a = \"oops\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "Unterminated string.");
        assert_eq!(errors[0].line, 2);
        assert_eq!(tokens.last().map(|t| t.tokentype), Some(TokenType::EOF));
    }

    #[test]
    fn scanning_continues_after_bad_character() {
        let (tokens, errors) = scanner::scan_tokens("1 # 2 @ 3");
        assert_eq!(errors.len(), 2);
        assert_eq!(format!("{}", errors[0]), "error: [line 1] Unexpected character '#'.");
        let numbers: Vec<_> = tokens
            .iter()
            .filter(|t| t.tokentype == TokenType::Number)
            .collect();
        assert_eq!(numbers.len(), 3);
    }

    #[test]
    fn end_of_input_is_idempotent() {
        let mut scanner = Scanner::new("a\n");
        assert_eq!(scanner.next_token().unwrap().tokentype, TokenType::Identifier);
        let first = scanner.next_token().unwrap();
        let second = scanner.next_token().unwrap();
        assert_eq!(first.tokentype, TokenType::EOF);
        assert_eq!(first, second);
        assert_eq!(second.line, 2);
    }
}
