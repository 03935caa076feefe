use lox::{
    ast::Position, check, parse, ErrorKind, Function, Interpreter, InterpreterConfig, LoxError, NativeFunction,
    NativeResult, Value,
};
use pretty_assertions::assert_eq;

fn printed(interpreter: Interpreter<Vec<u8>>) -> Vec<String> {
    String::from_utf8_lossy(&interpreter.into_output()).lines().map(str::to_owned).collect()
}

#[test]
fn session_keeps_state_between_units() -> anyhow::Result<()> {
    let mut interpreter = Interpreter::with_output(Vec::<u8>::new());

    assert_eq!(interpreter.evaluate_str("var total = 0")?, None);
    assert_eq!(interpreter.evaluate_str("fun add(n) { total = total + n; return total; }")?, None);
    assert_eq!(interpreter.evaluate_str("add(2)")?, Some(Value::Number(2.0)));
    assert_eq!(interpreter.evaluate_str("add(3);")?, None);
    assert_eq!(interpreter.evaluate_str("print total")?, None);

    assert_eq!(printed(interpreter), ["5"]);
    Ok(())
}

#[test]
fn failing_unit_is_discarded_and_session_continues() -> anyhow::Result<()> {
    let mut interpreter = Interpreter::with_output(Vec::<u8>::new());
    interpreter.evaluate_str("var a = 1;")?;

    let error = interpreter.evaluate_str("a = a + 1; print a; a = a / 0;").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::DivisionByZero);

    // Statements before the failure in that unit did run
    assert_eq!(interpreter.evaluate_str("a")?, Some(Value::Number(2.0)));
    assert_eq!(interpreter.evaluate_str("print 1 +").unwrap_err().kind(), ErrorKind::Syntax);
    assert_eq!(interpreter.evaluate_str("a * 10")?, Some(Value::Number(20.0)));
    Ok(())
}

#[test]
fn parse_errors_surface_as_syntax_errors() {
    let mut interpreter = Interpreter::with_output(Vec::<u8>::new());
    let error = interpreter.run("print (1 + 2;").unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Syntax);
    assert_eq!(error.position(), Some(Position::new(1, 13)));
}

#[test]
fn host_can_seed_natives() -> anyhow::Result<()> {
    fn double(values: &[Value], position: Position) -> NativeResult {
        match &values[0] {
            Value::Number(number) => Ok(Value::Number(number * 2.0)),
            other => Err(LoxError::type_error(format!("double expects a number, got {}", other.type_name()), position)),
        }
    }

    let mut interpreter = Interpreter::with_output(Vec::<u8>::new());
    interpreter
        .globals()
        .declare("double", Value::Function(Function::Builtin(NativeFunction::new("double", 1, double))));

    interpreter.run("print double(21);")?;
    assert_eq!(interpreter.run("double(\"x\");").unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(interpreter.run("double(1, 2);").unwrap_err().kind(), ErrorKind::Arity);
    assert_eq!(printed(interpreter), ["42"]);
    Ok(())
}

#[test]
fn checker_runs_without_evaluating() -> anyhow::Result<()> {
    let statements = parse("print 1;\nreturn;")?;
    let error = check(&statements).unwrap_err();
    assert_eq!(error.position(), Some(Position::new(2, 1)));
    Ok(())
}

#[test]
fn call_depth_is_configurable() {
    let source = "fun depth(n) { if (n == 0) return 0; return depth(n - 1); } print depth(30);";

    let mut shallow = Interpreter::with_output(Vec::<u8>::new()).with_config(InterpreterConfig::default().with_max_call_depth(10));
    let error = shallow.run(source).unwrap_err();
    assert!(matches!(error, LoxError::ResourceExhausted { limit: 10, .. }));

    let mut deep = Interpreter::with_output(Vec::<u8>::new()).with_config(InterpreterConfig::default().with_max_call_depth(2_000));
    deep.run("fun depth(n) { if (n == 0) return 0; return 1 + depth(n - 1); } print depth(1500);").unwrap();
    assert_eq!(printed(deep), ["1500"]);
}

#[test]
fn error_messages_carry_positions() {
    let mut interpreter = Interpreter::with_output(Vec::<u8>::new());
    let error = interpreter.run("var s = \"a\";\nvar n = s * 2;").unwrap_err();
    assert_eq!(error.to_string(), "[line 2:11] TypeError: operands of '*' must be numbers, got string");
}
