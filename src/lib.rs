pub mod ast;
mod builtin;
mod checker;
mod config;
mod environment;
mod error;
mod interpreter;
mod parser;
mod value;

#[cfg(test)]
mod test_utils;

pub use checker::check;
pub use config::{InterpreterConfig, DEFAULT_MAX_CALL_DEPTH, MAX_NESTING_DEPTH};
pub use environment::Environment;
pub use error::{ErrorKind, LoxError};
pub use interpreter::Interpreter;
pub use parser::{is_incomplete, parse, parse_unit, Unit};
pub use value::{Function, LoxFunction, NativeFunction, NativeResult, Value};
