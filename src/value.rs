use core::fmt;
use std::rc::Rc;

use crate::{
    ast::{FunctionDeclaration, Position},
    environment::Environment,
    error::LoxError,
};

pub type NativeResult = Result<Value, LoxError>;

/// A runtime value. Cloning is cheap: strings and functions are shared.
#[derive(Debug, Clone)]
pub enum Value {
    Number(f64),
    String(Rc<str>),
    Boolean(bool),
    Nil,
    Function(Function),
}

impl Value {
    /// `nil`, `false`, the number zero and the empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Nil => false,
            Self::Boolean(boolean) => *boolean,
            Self::Number(number) => *number != 0.0,
            Self::String(string) => !string.is_empty(),
            Self::Function(_) => true,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Boolean(_) => "boolean",
            Self::Nil => "nil",
            Self::Function(_) => "function",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Nil, Self::Nil) => true,
            (Self::Function(a), Self::Function(b)) => a == b,
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(Rc::from(value))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64's Display already drops a trailing `.0`
            Self::Number(number) => write!(f, "{}", number),
            Self::String(string) => f.write_str(string),
            Self::Boolean(boolean) => write!(f, "{}", boolean),
            Self::Nil => f.write_str("nil"),
            Self::Function(function) => function.fmt(f),
        }
    }
}

#[derive(Clone)]
pub enum Function {
    Builtin(NativeFunction),
    Lox(Rc<LoxFunction>),
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(native) => native.name,
            Self::Lox(function) => &function.declaration.name,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Builtin(native) => native.arity,
            Self::Lox(function) => function.declaration.parameters.len(),
        }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => a.name == b.name,
            (Self::Lox(a), Self::Lox(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(native) => write!(f, "<native fn {}>", native.name),
            Self::Lox(function) => write!(f, "<fn {}>", function.declaration.name),
        }
    }
}

// Printing the closure would walk back into the scope holding this function.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self as &dyn fmt::Display).fmt(f)
    }
}

/// A function implemented by the host.
#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub(crate) name: &'static str,
    pub(crate) arity: usize,
    pub(crate) function: fn(&[Value], Position) -> NativeResult,
}

impl NativeFunction {
    pub fn new(name: &'static str, arity: usize, function: fn(&[Value], Position) -> NativeResult) -> Self {
        Self { name, arity, function }
    }
}

/// A user-defined function paired with the scope it was declared in.
pub struct LoxFunction {
    pub(crate) declaration: Rc<FunctionDeclaration>,
    pub(crate) closure: Rc<Environment>,
}

impl LoxFunction {
    pub fn new(declaration: Rc<FunctionDeclaration>, closure: Rc<Environment>) -> Self {
        Self { declaration, closure }
    }
}
