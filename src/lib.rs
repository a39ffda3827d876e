pub mod ast;
pub mod callable;
pub mod class;
pub mod environment;
pub mod instance;
pub mod interpreter;
pub mod parser;
pub mod printer;
pub mod scanner;
pub mod token;
pub mod value;

use crate::ast::Statement;
use crate::interpreter::{Interpreter, RuntimeError};
use crate::parser::ParseError;
use crate::scanner::ScanError;
use crate::value::Value;
use std::io::Write;
use thiserror::Error;

/// Native stack for a thread running the interpreter. Deep enough for
/// `MAX_CALL_DEPTH` nested calls in an unoptimized build.
pub const INTERPRETER_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum LoxError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl LoxError {
    pub fn is_runtime(&self) -> bool {
        matches!(self, LoxError::Runtime(_))
    }
}

/// Scans and parses `source`, collecting every scan and syntax error.
pub fn parse_source(source: &str) -> (Vec<Statement>, Vec<LoxError>) {
    let (tokens, scan_errors) = scanner::scan_tokens(source);
    let (statements, parse_errors) = parser::parse(&tokens);
    let errors = scan_errors
        .into_iter()
        .map(LoxError::from)
        .chain(parse_errors.into_iter().map(LoxError::from))
        .collect();
    (statements, errors)
}

/// Runs `source` on `interpreter`. Nothing executes if the source has scan or
/// syntax errors. On success, returns the value of a trailing expression
/// statement.
pub fn run<W: Write>(
    source: &str,
    interpreter: &mut Interpreter<W>,
) -> Result<Option<Value>, Vec<LoxError>> {
    let (statements, errors) = parse_source(source);
    if !errors.is_empty() {
        return Err(errors);
    }
    interpreter
        .interpret(&statements)
        .map_err(|e| vec![LoxError::Runtime(e)])
}
