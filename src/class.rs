use crate::callable::LoxFunction;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct Class {
    data: Rc<ClassImpl>,
}

struct ClassImpl {
    name: String,
    superclass: Option<Class>,
    methods: BTreeMap<String, LoxFunction>,
}

impl Class {
    pub fn new(
        name: &str,
        superclass: Option<Class>,
        methods: BTreeMap<String, LoxFunction>,
    ) -> Class {
        Class {
            data: Rc::new(ClassImpl {
                name: name.to_string(),
                superclass,
                methods,
            }),
        }
    }
    pub fn name(&self) -> &str {
        &self.data.name
    }
    /// Looks the method up on this class, then along the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<LoxFunction> {
        match self.data.methods.get(name) {
            Some(method) => Some(method.clone()),
            None => self
                .data
                .superclass
                .as_ref()
                .and_then(|superclass| superclass.find_method(name)),
        }
    }
    /// Number of arguments a call to the class takes.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
    pub fn equals(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Class({})", self.data.name)
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data.name)
    }
}
