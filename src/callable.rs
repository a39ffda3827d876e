use crate::ast::FunctionDecl;
use crate::environment::EnvId;
use crate::instance::Instance;
use crate::value::Value;
use std::fmt;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A user-defined function: its declaration, the scope it closes over, and
/// the instance it is bound to when it was looked up as a method.
#[derive(Clone, Debug)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: EnvId,
    this: Option<Instance>,
    is_initializer: bool,
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}>", self.name())
    }
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvId, is_initializer: bool) -> LoxFunction {
        LoxFunction {
            declaration,
            closure,
            this: None,
            is_initializer,
        }
    }
    pub fn bind(&self, instance: Instance) -> LoxFunction {
        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: self.closure,
            this: Some(instance),
            is_initializer: self.is_initializer,
        }
    }
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }
    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }
    pub fn declaration(&self) -> &FunctionDecl {
        &self.declaration
    }
    pub fn closure(&self) -> EnvId {
        self.closure
    }
    pub fn this(&self) -> Option<&Instance> {
        self.this.as_ref()
    }
    pub fn is_initializer(&self) -> bool {
        self.is_initializer
    }
    pub fn equals(&self, other: &LoxFunction) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration)
            && self.closure == other.closure
            && match (&self.this, &other.this) {
                (None, None) => true,
                (Some(a), Some(b)) => a.equals(b),
                _ => false,
            }
    }
}

#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub call: fn(&[Value]) -> Value,
}

impl NativeFunction {
    pub fn equals(&self, other: &NativeFunction) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn>")
    }
}

fn clock(_arguments: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Value::Number(seconds)
}

/// Functions defined in the global scope of every interpreter.
pub fn natives() -> Vec<NativeFunction> {
    vec![NativeFunction {
        name: "clock",
        arity: 0,
        call: clock,
    }]
}
