use lox::Interpreter;

fn main() {
    let program = vec![
        "fun spam() { return eggs * 3; }",
        "spam()",
        "var eggs = 20",
        "spam()",
    ];

    let mut interpreter = Interpreter::new();
    for source in program {
        match interpreter.evaluate_str(source) {
            Ok(Some(value)) => println!("{}: {}", source, value),
            Ok(None) => println!("{}", source),
            Err(err) => println!("{}: {}", source, err)
        }
    }
}
