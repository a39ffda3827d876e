use crate::class::Class;
use crate::interpreter::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Cloning an `Instance` clones the handle; every clone sees the same fields.
#[derive(Clone)]
pub struct Instance {
    data: Rc<RefCell<InstanceImpl>>,
}

struct InstanceImpl {
    class: Class,
    fields: BTreeMap<String, Value>,
}

impl Instance {
    pub fn new(class: Class) -> Instance {
        Instance {
            data: Rc::new(RefCell::new(InstanceImpl {
                class,
                fields: BTreeMap::new(),
            })),
        }
    }
    pub fn class(&self) -> Class {
        self.data.borrow().class.clone()
    }
    /// Fields shadow methods. A method found on the class chain comes back
    /// bound to this instance.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(x) = self.data.borrow().fields.get(&name.lexeme) {
            return Ok(x.clone());
        }
        self.class()
            .find_method(&name.lexeme)
            .map(|method| Value::Function(method.bind(self.clone())))
            .ok_or_else(|| RuntimeError::undefined_property(name))
    }
    pub fn set(&self, name: &Token, value: Value) {
        self.data
            .borrow_mut()
            .fields
            .insert(name.lexeme.clone(), value);
    }
    pub fn equals(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Instance({})", self.data.borrow().class.name())
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} instance", self.data.borrow().class)
    }
}
