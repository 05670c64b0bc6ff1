//! Variable scopes
//!
//! A scope is a name table with an optional parent. Function locals point at
//! the locals of the function they were defined in, which gives closures
//! their late-binding view of enclosing variables. Module globals have no
//! parent; the interpreter consults them (and then the builtins) explicitly.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::Value;

#[derive(Debug, Default)]
pub struct Scope {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    #[must_use]
    pub fn new(parent: Option<Rc<Scope>>) -> Self {
        Self { vars: RefCell::default(), parent }
    }

    #[must_use]
    pub fn parent(&self) -> Option<Rc<Scope>> {
        self.parent.clone()
    }

    /// Look a name up here, then in each enclosing scope
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    pub fn set(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }

    /// Remove a binding from this scope only
    pub fn remove(&self, name: &str) -> Option<Value> {
        self.vars.borrow_mut().remove(name)
    }

    /// Move every binding out, leaving the scope empty
    #[must_use]
    pub fn take_vars(&self) -> HashMap<String, Value> {
        std::mem::take(&mut *self.vars.borrow_mut())
    }
}
