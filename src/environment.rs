use std::{cell::RefCell, collections::HashMap, rc::Rc};

use crate::{error::LoxError, value::Value};

/// A single lexical scope: its own bindings plus a link to the enclosing scope.
///
/// Scopes are shared through `Rc` so a closure can keep the scope it was
/// declared in alive after control has left it. Bindings live behind a
/// `RefCell` because `assign` writes through such a shared handle.
#[derive(Debug, Default)]
pub struct Environment {
    bindings: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// The global scope of a run.
    pub fn root(bindings: HashMap<String, Value>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(bindings),
            parent: None,
        })
    }

    pub fn new(parent: &Rc<Environment>) -> Rc<Self> {
        Rc::new(Self {
            bindings: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
        })
    }

    pub fn parent(&self) -> Option<&Rc<Environment>> {
        self.parent.as_ref()
    }

    /// Binds `name` in this scope, replacing a binding of the same name here
    /// and shadowing any in an enclosing scope.
    pub fn declare(&self, name: impl Into<String>, value: Value) {
        self.bindings.borrow_mut().insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Result<Value, LoxError> {
        if let Some(value) = self.bindings.borrow().get(name) {
            return Ok(value.clone());
        }
        match &self.parent {
            Some(parent) => parent.get(name),
            None => Err(LoxError::UndefinedVariable { name: name.to_owned(), position: None }),
        }
    }

    /// Overwrites the nearest existing binding of `name`. Never declares.
    pub fn assign(&self, name: &str, value: Value) -> Result<(), LoxError> {
        if let Some(slot) = self.bindings.borrow_mut().get_mut(name) {
            *slot = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(LoxError::UndefinedVariable { name: name.to_owned(), position: None }),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|parent| parent.contains(name))
    }
}
