use crate::token::Token;
use std::rc::Rc;

/// Expression nodes. Every child is exclusively owned by its parent; a node
/// is only ever reused in another position through `clone`, which is a deep
/// copy.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Assign {
        name: Token,
        value: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        operator: Token,
        right: Box<Expression>,
    },
    Call {
        callee: Box<Expression>,
        paren: Token,
        arguments: Vec<Expression>,
    },
    Get {
        object: Box<Expression>,
        name: Token,
    },
    Grouping(Box<Expression>),
    Logical {
        left: Box<Expression>,
        operator: Token,
        right: Box<Expression>,
    },
    Set {
        object: Box<Expression>,
        name: Token,
        value: Box<Expression>,
    },
    Super {
        keyword: Token,
        method: Token,
    },
    This(Token),
    Unary {
        operator: Token,
        right: Box<Expression>,
    },
    Variable(Token),
    Boolean(bool),
    Nil,
    Number(f64),
    String(String),
}

/// A function or method declaration. Runtime function values hold the same
/// `Rc`, so the body is never copied when a closure is created.
#[derive(Debug, PartialEq)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Block(Vec<Statement>),
    Expression(Expression),
    Print(Expression),
    Var {
        name: Token,
        initializer: Option<Expression>,
    },
    If {
        condition: Expression,
        then_branch: Box<Statement>,
        else_branch: Option<Box<Statement>>,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
    },
    Function(Rc<FunctionDecl>),
    Return {
        keyword: Token,
        value: Option<Expression>,
    },
    Class {
        name: Token,
        superclass: Option<Expression>,
        methods: Vec<Rc<FunctionDecl>>,
    },
}

impl Expression {
    /// Source line used when attributing a runtime error to this expression.
    pub fn line(&self) -> usize {
        match self {
            Expression::Assign { name, .. } => name.line,
            Expression::Binary { operator, .. } => operator.line,
            Expression::Call { paren, .. } => paren.line,
            Expression::Get { name, .. } => name.line,
            Expression::Grouping(inner) => inner.line(),
            Expression::Logical { operator, .. } => operator.line,
            Expression::Set { name, .. } => name.line,
            Expression::Super { keyword, .. } => keyword.line,
            Expression::This(keyword) => keyword.line,
            Expression::Unary { operator, .. } => operator.line,
            Expression::Variable(name) => name.line,
            Expression::Boolean(_)
            | Expression::Nil
            | Expression::Number(_)
            | Expression::String(_) => 0,
        }
    }
}

#[cfg(test)]
mod ast_tests {
    use crate::ast::Expression;
    use crate::token::{Token, TokenType};

    #[test]
    fn clone_is_deep() {
        let original = Expression::Get {
            object: Box::new(Expression::Variable(Token::new(
                TokenType::Identifier,
                "point",
                3,
            ))),
            name: Token::new(TokenType::Identifier, "x", 3),
        };
        let mut copy = original.clone();
        if let Expression::Get { object, .. } = &mut copy {
            **object = Expression::Nil;
        }
        assert_ne!(original, copy);
        assert_eq!(original.line(), 3);
    }
}
