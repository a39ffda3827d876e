use crate::ast::{Expression, FunctionDecl, Statement};
use crate::callable::{self, LoxFunction};
use crate::class::Class;
use crate::environment::{EnvId, Environment};
use crate::instance::Instance;
use crate::token::{Token, TokenType};
use crate::value::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::rc::Rc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("[line {line}] NameError: {message}")]
    Name { line: usize, message: String },
    #[error("[line {line}] TypeError: {message}")]
    Type { line: usize, message: String },
    #[error("[line {line}] ArityError: Expected {expected} arguments but got {got}.")]
    Arity {
        line: usize,
        expected: usize,
        got: usize,
    },
    #[error("[line {line}] StackOverflow: Stack overflow.")]
    StackOverflow { line: usize },
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl RuntimeError {
    pub fn undefined_variable(name: &Token) -> RuntimeError {
        RuntimeError::Name {
            line: name.line,
            message: format!("Undefined variable '{}'.", name.lexeme),
        }
    }
    pub fn undefined_property(name: &Token) -> RuntimeError {
        RuntimeError::Name {
            line: name.line,
            message: format!("Undefined property '{}'.", name.lexeme),
        }
    }
    fn type_error(line: usize, message: &str) -> RuntimeError {
        RuntimeError::Type {
            line,
            message: message.to_string(),
        }
    }
}

/// How a statement finished. Errors travel separately in the `Err` arm.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Normal,
    Return(Value),
}

/// Deepest chain of nested calls before a call fails with `StackOverflow`.
pub const MAX_CALL_DEPTH: usize = 1024;

pub struct Interpreter<W: Write = io::Stdout> {
    environment: Environment,
    out: W,
    depth: usize,
}

impl Interpreter<io::Stdout> {
    pub fn new() -> Interpreter<io::Stdout> {
        Interpreter::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl<W: Write> Interpreter<W> {
    /// An interpreter whose `print` statements write to `out`.
    pub fn with_output(out: W) -> Interpreter<W> {
        let mut environment = Environment::new();
        let global = environment.global();
        for native in callable::natives() {
            environment.define(global, native.name, Value::Native(native));
        }
        Interpreter {
            environment,
            out,
            depth: 0,
        }
    }
    pub fn into_output(self) -> W {
        self.out
    }
    pub fn environment(&self) -> &Environment {
        &self.environment
    }
    /// Runs a program in the global scope. Returns the value of the final
    /// statement when it is an expression statement.
    pub fn interpret(&mut self, statements: &[Statement]) -> Result<Option<Value>, RuntimeError> {
        debug!("interpreting {} statements", statements.len());
        let global = self.environment.global();
        let (last, rest) = match statements.split_last() {
            Some(x) => x,
            None => return Ok(None),
        };
        for stmt in rest {
            if let Completion::Return(_) = self.execute(stmt, global)? {
                return Ok(None);
            }
        }
        match last {
            Statement::Expression(expr) => self.evaluate(expr, global).map(Some),
            _ => {
                self.execute(last, global)?;
                Ok(None)
            }
        }
    }
    pub fn execute(&mut self, stmt: &Statement, env: EnvId) -> Result<Completion, RuntimeError> {
        match stmt {
            Statement::Print(e) => {
                let val = self.evaluate(e, env)?;
                writeln!(self.out, "{}", val)?;
            }
            Statement::Expression(e) => {
                self.evaluate(e, env)?;
            }
            Statement::Var { name, initializer } => {
                let val = match initializer {
                    Some(x) => self.evaluate(x, env)?,
                    None => Value::Nil,
                };
                self.environment.define(env, &name.lexeme, val);
            }
            Statement::Block(stmts) => {
                let block_env = self.environment.new_child(env);
                return self.execute_block(stmts, block_env);
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    return self.execute(then_branch, env);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch, env);
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    if let Completion::Return(x) = self.execute(body, env)? {
                        return Ok(Completion::Return(x));
                    }
                }
            }
            Statement::Function(decl) => {
                debug!(name = %decl.name.lexeme, arity = decl.params.len(), "defining function");
                self.environment.capture(env);
                let function = LoxFunction::new(Rc::clone(decl), env, false);
                self.environment
                    .define(env, &decl.name.lexeme, Value::Function(function));
            }
            Statement::Return { value, .. } => {
                let val = match value {
                    Some(x) => self.evaluate(x, env)?,
                    None => Value::Nil,
                };
                return Ok(Completion::Return(val));
            }
            Statement::Class {
                name,
                superclass,
                methods,
            } => self.class_declaration(name, superclass.as_ref(), methods, env)?,
        }
        Ok(Completion::Normal)
    }
    /// Runs `statements` in `env`, which the caller has already created, and
    /// releases it afterwards.
    pub fn execute_block(
        &mut self,
        statements: &[Statement],
        env: EnvId,
    ) -> Result<Completion, RuntimeError> {
        let mut result = Ok(Completion::Normal);
        for stmt in statements {
            match self.execute(stmt, env) {
                Ok(Completion::Normal) => (),
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.environment.release(env);
        result
    }
    fn class_declaration(
        &mut self,
        name: &Token,
        superclass: Option<&Expression>,
        methods: &[Rc<FunctionDecl>],
        env: EnvId,
    ) -> Result<(), RuntimeError> {
        let superclass = match superclass {
            None => None,
            Some(expr) => match self.evaluate(expr, env)? {
                Value::Class(x) => Some(x),
                _ => {
                    return Err(RuntimeError::type_error(
                        expr.line(),
                        "Superclass must be a class.",
                    ))
                }
            },
        };
        debug!(name = %name.lexeme, methods = methods.len(), "defining class");
        self.environment.define(env, &name.lexeme, Value::Nil);

        // Methods close over a scope holding `super`, so lookups through it
        // start at the superclass of the class that defines the method.
        let class_env = match &superclass {
            Some(x) => {
                let class_env = self.environment.new_child(env);
                self.environment
                    .define(class_env, "super", Value::Class(x.clone()));
                class_env
            }
            None => env,
        };
        self.environment.capture(class_env);

        let methods: BTreeMap<String, LoxFunction> = methods
            .iter()
            .map(|method| {
                let method_name = method.name.lexeme.clone();
                let is_initializer = method_name == "init";
                (
                    method_name,
                    LoxFunction::new(Rc::clone(method), class_env, is_initializer),
                )
            })
            .collect();
        let class = Class::new(&name.lexeme, superclass, methods);
        self.environment.assign(env, name, Value::Class(class))
    }
    pub fn evaluate(&mut self, expr: &Expression, env: EnvId) -> Result<Value, RuntimeError> {
        match expr {
            Expression::Boolean(x) => Ok(Value::Boolean(*x)),
            Expression::Nil => Ok(Value::Nil),
            Expression::Number(x) => Ok(Value::Number(*x)),
            Expression::String(x) => Ok(Value::String(x.clone())),
            Expression::Grouping(x) => self.evaluate(x, env),
            Expression::Unary { operator, right } => {
                let rv = self.evaluate(right, env)?;
                match operator.tokentype {
                    TokenType::Minus => match rv {
                        Value::Number(r) => Ok(Value::Number(-r)),
                        _ => Err(RuntimeError::type_error(
                            operator.line,
                            "Operand must be a number.",
                        )),
                    },
                    TokenType::Bang => Ok(Value::Boolean(!rv.is_truthy())),
                    _ => Err(RuntimeError::type_error(
                        operator.line,
                        "Unknown unary operator.",
                    )),
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let lv = self.evaluate(left, env)?;
                let rv = self.evaluate(right, env)?;
                binary(operator, lv, rv)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left, env)?;
                match operator.tokentype {
                    TokenType::Or if left.is_truthy() => Ok(left),
                    TokenType::And if !left.is_truthy() => Ok(left),
                    _ => self.evaluate(right, env),
                }
            }
            Expression::Variable(name) => self.environment.get(env, name),
            Expression::Assign { name, value } => {
                let value = self.evaluate(value, env)?;
                self.environment.assign(env, name, value.clone())?;
                Ok(value)
            }
            Expression::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee, env)?;
                let mut evaluated_arguments: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated_arguments.push(self.evaluate(argument, env)?);
                }
                self.call(callee, evaluated_arguments, paren)
            }
            Expression::Get { object, name } => match self.evaluate(object, env)? {
                Value::Instance(instance) => instance.get(name),
                _ => Err(RuntimeError::type_error(
                    name.line,
                    "Only instances have properties.",
                )),
            },
            Expression::Set {
                object,
                name,
                value,
            } => match self.evaluate(object, env)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value, env)?;
                    instance.set(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::type_error(
                    name.line,
                    "Only instances have fields.",
                )),
            },
            Expression::This(keyword) => self.environment.get(env, keyword),
            Expression::Super { keyword, method } => {
                let superclass = match self.environment.get(env, keyword)? {
                    Value::Class(x) => x,
                    _ => {
                        return Err(RuntimeError::type_error(
                            keyword.line,
                            "'super' must refer to a class.",
                        ))
                    }
                };
                let this = match self.environment.lookup(env, "this") {
                    Some(Value::Instance(x)) => x,
                    _ => {
                        return Err(RuntimeError::Name {
                            line: keyword.line,
                            message: "Can't use 'super' outside of a method.".to_string(),
                        })
                    }
                };
                superclass
                    .find_method(&method.lexeme)
                    .map(|m| Value::Function(m.bind(this)))
                    .ok_or_else(|| RuntimeError::undefined_property(method))
            }
        }
    }
    fn call(
        &mut self,
        callee: Value,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        let check_arity = |expected: usize| {
            if expected == arguments.len() {
                Ok(())
            } else {
                Err(RuntimeError::Arity {
                    line: paren.line,
                    expected,
                    got: arguments.len(),
                })
            }
        };
        match callee {
            Value::Function(function) => {
                check_arity(function.arity())?;
                self.call_function(&function, arguments, paren)
            }
            Value::Native(native) => {
                check_arity(native.arity)?;
                debug!(name = native.name, "calling native function");
                Ok((native.call)(&arguments))
            }
            Value::Class(class) => {
                check_arity(class.arity())?;
                let instance = Instance::new(class.clone());
                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(instance.clone()), arguments, paren)?;
                }
                Ok(Value::Instance(instance))
            }
            _ => Err(RuntimeError::type_error(
                paren.line,
                "Can only call functions and classes.",
            )),
        }
    }
    fn call_function(
        &mut self,
        function: &LoxFunction,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow { line: paren.line });
        }
        debug!(name = function.name(), depth = self.depth, "calling function");
        let env = self.environment.new_child(function.closure());
        if let Some(this) = function.this() {
            self.environment
                .define(env, "this", Value::Instance(this.clone()));
        }
        for (param, argument) in function.declaration().params.iter().zip(arguments) {
            self.environment.define(env, &param.lexeme, argument);
        }
        self.depth += 1;
        let completion = self.execute_block(&function.declaration().body, env);
        self.depth -= 1;
        let completion = completion?;
        if function.is_initializer() {
            if let Some(this) = function.this() {
                return Ok(Value::Instance(this.clone()));
            }
        }
        match completion {
            Completion::Return(x) => Ok(x),
            Completion::Normal => Ok(Value::Nil),
        }
    }
}

fn binary(operator: &Token, lv: Value, rv: Value) -> Result<Value, RuntimeError> {
    match operator.tokentype {
        TokenType::EqualEqual => return Ok(Value::Boolean(lv.equals(&rv))),
        TokenType::BangEqual => return Ok(Value::Boolean(!lv.equals(&rv))),
        TokenType::Plus => {
            return match (lv, rv) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(mut l), Value::String(r)) => {
                    l.push_str(&r);
                    Ok(Value::String(l))
                }
                _ => Err(RuntimeError::type_error(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )),
            }
        }
        _ => (),
    }
    let (l, r) = match (lv, rv) {
        (Value::Number(l), Value::Number(r)) => (l, r),
        _ => {
            return Err(RuntimeError::type_error(
                operator.line,
                "Operands must be numbers.",
            ))
        }
    };
    match operator.tokentype {
        TokenType::Minus => Ok(Value::Number(l - r)),
        TokenType::Slash => Ok(Value::Number(l / r)),
        TokenType::Star => Ok(Value::Number(l * r)),
        TokenType::Greater => Ok(Value::Boolean(l > r)),
        TokenType::GreaterEqual => Ok(Value::Boolean(l >= r)),
        TokenType::Less => Ok(Value::Boolean(l < r)),
        TokenType::LessEqual => Ok(Value::Boolean(l <= r)),
        _ => Err(RuntimeError::type_error(
            operator.line,
            "Unknown binary operator.",
        )),
    }
}
