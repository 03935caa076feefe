use lox::{parse, ast::Stmt, Interpreter, LoxError};

fn main() {
    let programs = vec![
        "fun make(n) { fun inc() { n = n + 1; return n; } return inc; } var c = make(5);",
        "print c(); print c();",
        "print c(1);",
    ].into_iter()
        .map(|source| parse(source).map(|statements| (source, statements)))
        .collect::<Result<Vec<(&str, Vec<Stmt>)>, LoxError>>();

    let programs = match programs {
        Ok(programs) => programs,
        Err(err) => return eprintln!("{}", err),
    };

    let mut interpreter = Interpreter::new();
    for (source, statements) in &programs {
        if let Err(err) = interpreter.interpret(statements) {
            println!("{}: {}", source, err)
        }
    }
}
