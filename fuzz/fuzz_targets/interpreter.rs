#![no_main]

use core::fmt;

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

#[derive(Arbitrary, Debug)]
enum Name {
    A, B, C, F, G,
    Clock, Str, Type, Len,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Name::A => "a",
            Name::B => "b",
            Name::C => "c",
            Name::F => "f",
            Name::G => "g",
            Name::Clock => "clock",
            Name::Str => "str",
            Name::Type => "type",
            Name::Len => "len",
        })
    }
}

#[derive(Arbitrary, Debug)]
enum Operator {
    Add, Sub, Mul, Div, Rem,
    Eq, NotEq, Less, LessEq, Greater, GreaterEq,
    And, Or,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Eq => "==",
            Operator::NotEq => "!=",
            Operator::Less => "<",
            Operator::LessEq => "<=",
            Operator::Greater => ">",
            Operator::GreaterEq => ">=",
            Operator::And => "and",
            Operator::Or => "or",
        })
    }
}

#[derive(Arbitrary, Debug)]
enum LoxExpr {
    Number(u8),
    String(bool),
    Boolean(bool),
    Nil,
    Variable(Name),
    Negate(Box<LoxExpr>),
    Not(Box<LoxExpr>),
    Binary(Box<LoxExpr>, Operator, Box<LoxExpr>),
    Assign(Name, Box<LoxExpr>),
    Call(Name, Vec<LoxExpr>),
}

impl fmt::Display for LoxExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoxExpr::Number(number) => write!(f, "{}", number),
            LoxExpr::String(empty) => f.write_str(if *empty { "\"\"" } else { "\"text\"" }),
            LoxExpr::Boolean(boolean) => write!(f, "{}", boolean),
            LoxExpr::Nil => f.write_str("nil"),
            LoxExpr::Variable(name) => name.fmt(f),
            LoxExpr::Negate(operand) => write!(f, "-({})", operand),
            LoxExpr::Not(operand) => write!(f, "!({})", operand),
            LoxExpr::Binary(left, operator, right) => write!(f, "({} {} {})", left, operator, right),
            LoxExpr::Assign(name, value) => write!(f, "({} = {})", name, value),
            LoxExpr::Call(name, arguments) => write!(f, "{}({})", name, arguments.iter().join(", ")),
        }
    }
}

#[derive(Arbitrary, Debug)]
enum LoxStmt {
    Expression(LoxExpr),
    Print(LoxExpr),
    Var(Name, LoxExpr),
    Block(Vec<LoxStmt>),
    If(LoxExpr, Box<LoxStmt>, Option<Box<LoxStmt>>),
    // Loops are bounded by their own counter so every program terminates
    Repeat(u8, Box<LoxStmt>),
    Function(Name, Vec<Name>, Vec<LoxStmt>),
    Return(Option<LoxExpr>),
}

impl fmt::Display for LoxStmt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoxStmt::Expression(expression) => write!(f, "{};", expression),
            LoxStmt::Print(expression) => write!(f, "print {};", expression),
            LoxStmt::Var(name, value) => write!(f, "var {} = {};", name, value),
            LoxStmt::Block(statements) => write!(f, "{{ {} }}", statements.iter().join(" ")),
            LoxStmt::If(condition, then_branch, None) => write!(f, "if ({}) {}", condition, then_branch),
            LoxStmt::If(condition, then_branch, Some(else_branch))
                => write!(f, "if ({}) {} else {}", condition, then_branch, else_branch),
            LoxStmt::Repeat(times, body)
                => write!(f, "for (var counter = 0; counter < {}; counter = counter + 1) {}", times % 8, body),
            LoxStmt::Function(name, parameters, body)
                => write!(f, "fun {}({}) {{ {} }}", name, parameters.iter().unique_by(|p| p.to_string()).join(", "), body.iter().join(" ")),
            LoxStmt::Return(None) => f.write_str("return;"),
            LoxStmt::Return(Some(value)) => write!(f, "return {};", value),
        }
    }
}

fuzz_target!(|statements: Vec<LoxStmt>| {
    let source = statements.iter().join("\n");
    let config = lox::InterpreterConfig::default().with_max_call_depth(16);
    let mut interpreter = lox::Interpreter::with_output(std::io::sink()).with_config(config);
    let _ = interpreter.run(&source);
});
