use std::{collections::HashMap, rc::Rc, time::{SystemTime, UNIX_EPOCH}};

use crate::{
    ast::Position,
    environment::Environment,
    error::LoxError,
    value::{Function, NativeFunction, NativeResult, Value},
};


fn builtin_clock(_values: &[Value], _position: Position) -> NativeResult {
    // A clock before the epoch reads as zero rather than failing the program
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(seconds))
}

fn builtin_str(values: &[Value], _position: Position) -> NativeResult {
    Ok(match &values[0] {
        string @ Value::String(_) => string.clone(),
        other => Value::from(other.to_string()),
    })
}

fn builtin_type(values: &[Value], _position: Position) -> NativeResult {
    Ok(Value::from(values[0].type_name()))
}

fn builtin_len(values: &[Value], position: Position) -> NativeResult {
    match &values[0] {
        Value::String(string) => Ok(Value::Number(string.chars().count() as f64)),
        other => Err(LoxError::type_error(
            format!("len expects a string, got {}", other.type_name()),
            position,
        )),
    }
}

fn native(name: &'static str, arity: usize, function: fn(&[Value], Position) -> NativeResult) -> (String, Value) {
    (name.to_owned(), Value::Function(Function::Builtin(NativeFunction::new(name, arity, function))))
}

/// The global scope, seeded with the native functions.
///
/// Arity is checked by the caller before a native runs, so each one may index
/// its arguments directly.
pub(crate) fn builtin_environment() -> Rc<Environment> {
    Environment::root(HashMap::from([
        native("clock", 0, builtin_clock),
        native("str", 1, builtin_str),
        native("type", 1, builtin_type),
        native("len", 1, builtin_len),
    ]))
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    use super::*;

    fn call(name: &str, arguments: &[Value]) -> NativeResult {
        match builtin_environment().get(name)? {
            Value::Function(Function::Builtin(native)) => (native.function)(arguments, Position::new(1, 1)),
            other => panic!("{} is not a builtin: {:?}", name, other),
        }
    }

    #[test]
    fn str_renders_like_print() -> anyhow::Result<()> {
        assert_eq!(call("str", &[Value::Number(4.0)])?, Value::from("4"));
        assert_eq!(call("str", &[Value::Nil])?, Value::from("nil"));
        assert_eq!(call("str", &[Value::from("x")])?, Value::from("x"));
        Ok(())
    }

    #[test]
    fn type_names() -> anyhow::Result<()> {
        assert_eq!(call("type", &[Value::Boolean(false)])?, Value::from("boolean"));
        assert_eq!(call("type", &[call("str", &[Value::Nil])?])?, Value::from("string"));
        Ok(())
    }

    #[test]
    fn len_counts_characters_and_rejects_numbers() -> anyhow::Result<()> {
        assert_eq!(call("len", &[Value::from("héllo")])?, Value::Number(5.0));
        assert_eq!(call("len", &[Value::Number(1.0)]).unwrap_err().kind(), ErrorKind::Type);
        Ok(())
    }

    #[test]
    fn clock_is_positive() -> anyhow::Result<()> {
        match call("clock", &[])? {
            Value::Number(seconds) => assert!(seconds > 0.0),
            other => panic!("clock returned {:?}", other),
        }
        Ok(())
    }
}
