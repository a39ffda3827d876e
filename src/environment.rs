use crate::interpreter::RuntimeError;
use crate::token::Token;
use crate::value::Value;
use std::collections::BTreeMap;
use tracing::trace;

/// Handle to a scope in the `Environment` arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnvId(usize);

#[derive(Debug)]
struct Scope {
    values: BTreeMap<String, Value>,
    enclosing: Option<EnvId>,
    // Reachable from a function or class value.
    captured: bool,
}

/// Every scope of a session lives in one arena and refers to its parent by
/// handle, so closures can share scopes without reference cycles. The
/// arena is dropped as a whole when the interpreter goes away.
#[derive(Debug)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            scopes: vec![Scope {
                values: BTreeMap::new(),
                enclosing: None,
                captured: true,
            }],
        }
    }
    pub fn global(&self) -> EnvId {
        EnvId(0)
    }
    pub fn new_child(&mut self, enclosing: EnvId) -> EnvId {
        self.scopes.push(Scope {
            values: BTreeMap::new(),
            enclosing: Some(enclosing),
            captured: false,
        });
        let id = EnvId(self.scopes.len() - 1);
        trace!(scope = id.0, parent = enclosing.0, "allocated scope");
        id
    }
    /// Marks a scope and all of its ancestors as reachable from a closure.
    pub fn capture(&mut self, id: EnvId) {
        let mut cur = Some(id);
        while let Some(EnvId(idx)) = cur {
            let scope = &mut self.scopes[idx];
            if scope.captured {
                break;
            }
            scope.captured = true;
            cur = scope.enclosing;
        }
    }
    /// Frees a scope on block or call exit. Only the most recent scope can be
    /// freed, and only if nothing captured it.
    pub fn release(&mut self, id: EnvId) {
        if id.0 + 1 == self.scopes.len() && !self.scopes[id.0].captured {
            self.scopes.pop();
            trace!(scope = id.0, "released scope");
        }
    }
    pub fn define(&mut self, id: EnvId, name: &str, value: Value) {
        self.scopes[id.0].values.insert(name.to_string(), value);
    }
    pub fn lookup(&self, id: EnvId, name: &str) -> Option<Value> {
        let mut cur = Some(id);
        while let Some(EnvId(idx)) = cur {
            let scope = &self.scopes[idx];
            if let Some(x) = scope.values.get(name) {
                return Some(x.clone());
            }
            cur = scope.enclosing;
        }
        None
    }
    pub fn get(&self, id: EnvId, token: &Token) -> Result<Value, RuntimeError> {
        self.lookup(id, &token.lexeme)
            .ok_or_else(|| RuntimeError::undefined_variable(token))
    }
    pub fn assign(&mut self, id: EnvId, token: &Token, value: Value) -> Result<(), RuntimeError> {
        let mut cur = Some(id);
        while let Some(EnvId(idx)) = cur {
            let scope = &mut self.scopes[idx];
            if let Some(x) = scope.values.get_mut(&token.lexeme) {
                *x = value;
                return Ok(());
            }
            cur = scope.enclosing;
        }
        Err(RuntimeError::undefined_variable(token))
    }
    pub fn len(&self) -> usize {
        self.scopes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

#[cfg(test)]
mod environment_tests {
    use crate::environment::Environment;
    use crate::token::{Token, TokenType};
    use crate::value::Value;

    fn name(x: &str) -> Token {
        Token::new(TokenType::Identifier, x, 1)
    }

    #[test]
    fn lookup_walks_outward() {
        let mut env = Environment::new();
        let global = env.global();
        env.define(global, "a", Value::Number(1.0));
        let inner = env.new_child(global);
        assert_eq!(env.get(inner, &name("a")).unwrap(), Value::Number(1.0));
        assert!(env.get(inner, &name("b")).is_err());
    }

    #[test]
    fn shadowing_is_local() {
        let mut env = Environment::new();
        let global = env.global();
        env.define(global, "a", Value::Number(1.0));
        let inner = env.new_child(global);
        env.define(inner, "a", Value::Number(2.0));
        assert_eq!(env.get(inner, &name("a")).unwrap(), Value::Number(2.0));
        assert_eq!(env.get(global, &name("a")).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn assign_updates_nearest_binding() {
        let mut env = Environment::new();
        let global = env.global();
        env.define(global, "a", Value::Number(1.0));
        let inner = env.new_child(global);
        env.assign(inner, &name("a"), Value::Number(5.0)).unwrap();
        assert_eq!(env.get(global, &name("a")).unwrap(), Value::Number(5.0));
        assert!(env.assign(inner, &name("missing"), Value::Nil).is_err());
    }

    #[test]
    fn release_only_frees_uncaptured_tail() {
        let mut env = Environment::new();
        let global = env.global();
        let block = env.new_child(global);
        env.release(block);
        assert_eq!(env.len(), 1);

        let outer = env.new_child(global);
        let inner = env.new_child(outer);
        env.capture(inner);
        env.release(inner);
        env.release(outer);
        assert_eq!(env.len(), 3);

        let other = env.new_child(global);
        let last = env.new_child(global);
        env.release(other);
        assert_eq!(env.len(), 5);
        env.release(last);
        assert_eq!(env.len(), 4);
    }
}
