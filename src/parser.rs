use crate::ast::{Expression, FunctionDecl, Statement};
use crate::token::{Literal, Token, TokenType};
use std::rc::Rc;
use thiserror::Error;

/// Upper bound on declared parameters and on arguments at a call site.
pub const MAX_ARGUMENTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("error: [line {line}]{location}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub location: String,
    pub message: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum FunctionType {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum ClassType {
    None,
    Class,
    Subclass,
}

pub struct Parser<'a> {
    tokens: &'a [Token],
    current: usize,
    eof: Token,
    errors: Vec<ParseError>,
    current_function: FunctionType,
    current_class: ClassType,
}

/// Parses a whole program. Malformed statements are reported and skipped, so
/// the returned program only contains statements that parsed cleanly.
pub fn parse(tokens: &[Token]) -> (Vec<Statement>, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    let statements = parser.parse();
    (statements, parser.errors)
}

type ParseResult<T> = Result<T, ParseError>;

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Parser<'a> {
        let line = tokens.last().map_or(1, |t| t.line);
        Parser {
            tokens,
            current: 0,
            eof: Token::new(TokenType::EOF, "", line),
            errors: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
        }
    }
    pub fn parse(&mut self) -> Vec<Statement> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        statements
    }
    fn declaration(&mut self) -> Option<Statement> {
        let result = match self.peek().tokentype {
            TokenType::Class => {
                self.advance();
                self.class_declaration()
            }
            TokenType::Fun => {
                self.advance();
                self.function(FunctionType::Function)
                    .map(Statement::Function)
            }
            TokenType::Var => {
                self.advance();
                self.var_declaration()
            }
            _ => self.statement(),
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }
    fn class_declaration(&mut self) -> ParseResult<Statement> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?;
        let superclass = if self.match_token(TokenType::Less) {
            let superclass_name = self.consume(TokenType::Identifier, "Expect superclass name.")?;
            if superclass_name.lexeme == name.lexeme {
                self.report(&superclass_name, "A class can't inherit from itself.");
            }
            Some(Expression::Variable(superclass_name))
        } else {
            None
        };
        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;

        let enclosing_class = self.current_class;
        self.current_class = match superclass {
            Some(_) => ClassType::Subclass,
            None => ClassType::Class,
        };
        let methods = self.methods();
        self.current_class = enclosing_class;
        let methods = methods?;

        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;
        Ok(Statement::Class {
            name,
            superclass,
            methods,
        })
    }
    fn methods(&mut self) -> ParseResult<Vec<Rc<FunctionDecl>>> {
        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            let kind = if self.peek().lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };
            methods.push(self.function(kind)?);
        }
        Ok(methods)
    }
    fn function(&mut self, kind: FunctionType) -> ParseResult<Rc<FunctionDecl>> {
        let noun = match kind {
            FunctionType::Function => "function",
            _ => "method",
        };
        let name = self.consume(TokenType::Identifier, &format!("Expect {} name.", noun))?;
        self.consume(
            TokenType::LeftParen,
            &format!("Expect '(' after {} name.", noun),
        )?;
        let mut params: Vec<Token> = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at_current(&format!(
                        "Can't have more than {} parameters.",
                        MAX_ARGUMENTS
                    )));
                }
                params.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;
        self.consume(
            TokenType::LeftBrace,
            &format!("Expect '{{' before {} body.", noun),
        )?;

        let enclosing_function = self.current_function;
        self.current_function = kind;
        let body = self.block();
        self.current_function = enclosing_function;

        Ok(Rc::new(FunctionDecl {
            name,
            params,
            body: body?,
        }))
    }
    fn var_declaration(&mut self) -> ParseResult<Statement> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;
        let initializer = if self.match_token(TokenType::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Statement::Var { name, initializer })
    }
    fn statement(&mut self) -> ParseResult<Statement> {
        match self.peek().tokentype {
            TokenType::If => {
                self.advance();
                self.if_statement()
            }
            TokenType::Print => {
                self.advance();
                self.print_statement()
            }
            TokenType::Return => {
                self.advance();
                self.return_statement()
            }
            TokenType::LeftBrace => {
                self.advance();
                Ok(Statement::Block(self.block()?))
            }
            TokenType::While => {
                self.advance();
                self.while_statement()
            }
            TokenType::For => {
                self.advance();
                self.for_statement()
            }
            _ => self.expression_statement(),
        }
    }
    fn for_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        let initializer: Option<Statement> = match self.peek().tokentype {
            TokenType::Semicolon => {
                self.advance();
                None
            }
            TokenType::Var => {
                self.advance();
                Some(self.var_declaration()?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition = match self.peek().tokentype {
            TokenType::Semicolon => Expression::Boolean(true),
            _ => self.expression()?,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment: Option<Expression> = match self.peek().tokentype {
            TokenType::RightParen => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(x) = increment {
            body = Statement::Block(vec![body, Statement::Expression(x)])
        }
        body = Statement::While {
            condition,
            body: Box::new(body),
        };
        match initializer {
            None => Ok(body),
            Some(x) => Ok(Statement::Block(vec![x, body])),
        }
    }
    fn while_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = self.statement()?;
        Ok(Statement::While {
            condition,
            body: Box::new(body),
        })
    }
    fn if_statement(&mut self) -> ParseResult<Statement> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }
    fn return_statement(&mut self) -> ParseResult<Statement> {
        let keyword = self.previous().clone();
        if self.current_function == FunctionType::None {
            self.report(&keyword, "Can't return from top-level code.");
        }
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        if value.is_some() && self.current_function == FunctionType::Initializer {
            self.report(&keyword, "Can't return a value from an initializer.");
        }
        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Statement::Return { keyword, value })
    }
    /// Statements up to and including the closing brace. The opening brace
    /// has already been consumed.
    fn block(&mut self) -> ParseResult<Vec<Statement>> {
        let mut statements: Vec<Statement> = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }
    fn print_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print(expr))
    }
    fn expression_statement(&mut self) -> ParseResult<Statement> {
        let expr = self.expression()?;
        // A trailing expression right before end of input may omit its ';'.
        if !self.is_at_end() {
            self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        }
        Ok(Statement::Expression(expr))
    }
    fn expression(&mut self) -> ParseResult<Expression> {
        self.assignment()
    }
    fn assignment(&mut self) -> ParseResult<Expression> {
        let expr = self.or()?;
        if self.match_token(TokenType::Equal) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);
            return match expr {
                Expression::Variable(name) => Ok(Expression::Assign { name, value }),
                Expression::Get { object, name } => Ok(Expression::Set {
                    object,
                    name,
                    value,
                }),
                _ => Err(self.error_at(&equals, "Invalid assignment target.")),
            };
        }
        Ok(expr)
    }
    fn or(&mut self) -> ParseResult<Expression> {
        let mut expr = self.and()?;
        while self.match_token(TokenType::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn and(&mut self) -> ParseResult<Expression> {
        let mut expr = self.equality()?;
        while self.match_token(TokenType::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    /// One left-associative binary precedence level.
    fn binary(
        &mut self,
        operators: &[TokenType],
        operand: fn(&mut Parser<'a>) -> ParseResult<Expression>,
    ) -> ParseResult<Expression> {
        let mut expr = operand(self)?;
        while operators.contains(&self.peek().tokentype) {
            self.advance();
            let operator = self.previous().clone();
            let right = operand(self)?;
            expr = Expression::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn equality(&mut self) -> ParseResult<Expression> {
        self.binary(
            &[TokenType::BangEqual, TokenType::EqualEqual],
            Parser::comparison,
        )
    }
    fn comparison(&mut self) -> ParseResult<Expression> {
        self.binary(
            &[
                TokenType::Greater,
                TokenType::GreaterEqual,
                TokenType::Less,
                TokenType::LessEqual,
            ],
            Parser::term,
        )
    }
    fn term(&mut self) -> ParseResult<Expression> {
        self.binary(&[TokenType::Minus, TokenType::Plus], Parser::factor)
    }
    fn factor(&mut self) -> ParseResult<Expression> {
        self.binary(&[TokenType::Slash, TokenType::Star], Parser::unary)
    }
    fn unary(&mut self) -> ParseResult<Expression> {
        match self.peek().tokentype {
            TokenType::Bang | TokenType::Minus => {
                self.advance();
                let operator = self.previous().clone();
                let right = self.unary()?;
                Ok(Expression::Unary {
                    operator,
                    right: Box::new(right),
                })
            }
            _ => self.call(),
        }
    }
    fn call(&mut self) -> ParseResult<Expression> {
        let mut expr = self.primary()?;
        loop {
            if self.match_token(TokenType::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(TokenType::Dot) {
                let name =
                    self.consume(TokenType::Identifier, "Expect property name after '.'.")?;
                expr = Expression::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }
    fn finish_call(&mut self, callee: Expression) -> ParseResult<Expression> {
        let mut arguments: Vec<Expression> = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    return Err(self.error_at_current(&format!(
                        "Can't have more than {} arguments.",
                        MAX_ARGUMENTS
                    )));
                }
                arguments.push(self.expression()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expression::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }
    fn primary(&mut self) -> ParseResult<Expression> {
        let token = self.peek().clone();
        match token.tokentype {
            TokenType::False => {
                self.advance();
                Ok(Expression::Boolean(false))
            }
            TokenType::True => {
                self.advance();
                Ok(Expression::Boolean(true))
            }
            TokenType::Nil => {
                self.advance();
                Ok(Expression::Nil)
            }
            TokenType::Number | TokenType::String => {
                self.advance();
                match token.literal {
                    Some(Literal::Number(x)) => Ok(Expression::Number(x)),
                    Some(Literal::String(x)) => Ok(Expression::String(x)),
                    None => Err(self.error_at(&token, "Literal token without a value.")),
                }
            }
            TokenType::This => {
                self.advance();
                if self.current_class == ClassType::None {
                    self.report(&token, "Can't use 'this' outside of a class.");
                }
                Ok(Expression::This(token))
            }
            TokenType::Super => {
                self.advance();
                match self.current_class {
                    ClassType::None => {
                        self.report(&token, "Can't use 'super' outside of a class.")
                    }
                    ClassType::Class => {
                        self.report(&token, "Can't use 'super' in a class with no superclass.")
                    }
                    ClassType::Subclass => (),
                }
                self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
                let method = self.consume(TokenType::Identifier, "Expect superclass method name.")?;
                Ok(Expression::Super {
                    keyword: token,
                    method,
                })
            }
            TokenType::Identifier => {
                self.advance();
                Ok(Expression::Variable(token))
            }
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                Ok(Expression::Grouping(Box::new(expr)))
            }
            _ => Err(self.error_at_current("Expect expression.")),
        }
    }
    /// Discards tokens until a likely statement boundary.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let TokenType::Semicolon = self.previous().tokentype {
                return;
            }
            match self.peek().tokentype {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => (),
            }
            self.advance();
        }
    }
    fn consume(&mut self, tokentype: TokenType, message: &str) -> ParseResult<Token> {
        if self.check(tokentype) {
            Ok(self.advance().clone())
        } else {
            Err(self.error_at_current(message))
        }
    }
    fn match_token(&mut self, tokentype: TokenType) -> bool {
        if self.check(tokentype) {
            self.advance();
            true
        } else {
            false
        }
    }
    fn check(&self, tokentype: TokenType) -> bool {
        self.peek().tokentype == tokentype
    }
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    fn is_at_end(&self) -> bool {
        self.check(TokenType::EOF)
    }
    fn peek(&self) -> &Token {
        self.tokens.get(self.current).unwrap_or(&self.eof)
    }
    fn previous(&self) -> &Token {
        self.tokens
            .get(self.current.saturating_sub(1))
            .unwrap_or(&self.eof)
    }
    fn error_at_current(&self, message: &str) -> ParseError {
        self.error_at(self.peek(), message)
    }
    fn error_at(&self, token: &Token, message: &str) -> ParseError {
        let location = match token.tokentype {
            TokenType::EOF => " at end".to_string(),
            _ => format!(" at '{}'", token.lexeme),
        };
        ParseError {
            line: token.line,
            location,
            message: message.to_string(),
        }
    }
    /// Records an error that does not stop the current construct from parsing.
    fn report(&mut self, token: &Token, message: &str) {
        let error = self.error_at(token, message);
        self.errors.push(error);
    }
}

#[cfg(test)]
mod parser_tests {
    use crate::ast::{Expression, Statement};
    use crate::parser::{self, ParseError};
    use crate::scanner;
    use crate::token::TokenType;

    fn parse(source: &str) -> (Vec<Statement>, Vec<ParseError>) {
        let (tokens, scan_errors) = scanner::scan_tokens(source);
        assert!(scan_errors.is_empty(), "{:?}", scan_errors);
        parser::parse(&tokens)
    }

    fn parse_ok(source: &str) -> Vec<Statement> {
        let (statements, errors) = parse(source);
        assert!(errors.is_empty(), "{:?}", errors);
        statements
    }

    fn messages(source: &str) -> Vec<String> {
        parse(source).1.into_iter().map(|e| e.message).collect()
    }

    fn single_expression(source: &str) -> Expression {
        match parse_ok(source).remove(0) {
            Statement::Expression(e) => e,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn factor_binds_tighter_than_term() {
        match single_expression("1 + 2 * 3;") {
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                assert_eq!(operator.tokentype, TokenType::Plus);
                assert_eq!(*left, Expression::Number(1.0));
                assert!(matches!(*right, Expression::Binary { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn binary_operators_are_left_associative() {
        match single_expression("1 - 2 - 3;") {
            Expression::Binary { left, right, .. } => {
                assert!(matches!(*left, Expression::Binary { .. }));
                assert_eq!(*right, Expression::Number(3.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn assignment_is_right_associative() {
        match single_expression("a = b = 1;") {
            Expression::Assign { name, value } => {
                assert_eq!(name.lexeme, "a");
                assert!(matches!(*value, Expression::Assign { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn get_target_becomes_set() {
        match single_expression("a.b.c = 1;") {
            Expression::Set { object, name, .. } => {
                assert_eq!(name.lexeme, "c");
                assert!(matches!(*object, Expression::Get { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn invalid_assignment_target() {
        assert_eq!(messages("1 + a = 2;"), vec!["Invalid assignment target."]);
    }

    #[test]
    fn logical_operators() {
        match single_expression("a or b and c;") {
            Expression::Logical { operator, right, .. } => {
                assert_eq!(operator.tokentype, TokenType::Or);
                assert!(matches!(*right, Expression::Logical { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn for_loop_desugars_to_while() {
        let statements = parse_ok("for (var i = 0; i < 3; i = i + 1) print i;");
        match &statements[0] {
            Statement::Block(inner) => {
                assert!(matches!(inner[0], Statement::Var { .. }));
                assert!(matches!(inner[1], Statement::While { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn class_with_superclass() {
        let statements = parse_ok("class B < A { init(x) { this.x = x; } get() { return this.x; } }");
        match &statements[0] {
            Statement::Class {
                name,
                superclass,
                methods,
            } => {
                assert_eq!(name.lexeme, "B");
                assert!(matches!(superclass, Some(Expression::Variable(_))));
                assert_eq!(methods.len(), 2);
                assert_eq!(methods[0].params.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn resynchronizes_and_reports_every_error() {
        let (statements, errors) = parse("var = 1;\nprint 2;\nprint (3;\nprint 4;");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].line, 1);
        assert_eq!(errors[0].message, "Expect variable name.");
        assert_eq!(errors[1].line, 3);
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn error_rendering() {
        let (_, errors) = parse("print 1");
        assert_eq!(
            format!("{}", errors[0]),
            "error: [line 1] at end: Expect ';' after value."
        );
    }

    #[test]
    fn argument_cap() {
        assert!(parse("f(1, 2, 3, 4, 5, 6, 7, 8);").1.is_empty());
        assert_eq!(
            messages("f(1, 2, 3, 4, 5, 6, 7, 8, 9);\nprint 1;"),
            vec!["Can't have more than 8 arguments."]
        );
        assert_eq!(
            messages("fun f(a, b, c, d, e, f, g, h, i) {}"),
            vec!["Can't have more than 8 parameters."]
        );
    }

    #[test]
    fn trailing_expression_may_omit_semicolon() {
        assert_eq!(parse_ok("1 + 2").len(), 1);
        assert_eq!(messages("1 + 2 print 3;"), vec!["Expect ';' after expression."]);
    }

    #[test]
    fn static_context_checks() {
        assert_eq!(messages("return 1;"), vec!["Can't return from top-level code."]);
        assert_eq!(messages("print this;"), vec!["Can't use 'this' outside of a class."]);
        assert_eq!(
            messages("class A { m() { return super.m(); } }"),
            vec!["Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            messages("class A { init() { return 1; } }"),
            vec!["Can't return a value from an initializer."]
        );
        assert_eq!(messages("class A < A {}"), vec!["A class can't inherit from itself."]);
        assert!(messages("class A { init() { return; } }").is_empty());
    }

    #[test]
    fn empty_token_stream() {
        let (statements, errors) = parser::parse(&[]);
        assert!(statements.is_empty());
        assert!(errors.is_empty());
    }
}
