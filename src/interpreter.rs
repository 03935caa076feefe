use std::{
    io::{self, Write},
    rc::Rc,
};

use tracing::{debug, trace};

use crate::{
    ast::{BinaryOperator, Expr, ExprKind, Literal, LogicalOperator, Position, Stmt, StmtKind, UnaryOperator},
    builtin::builtin_environment,
    checker,
    config::{ensure_sufficient_stack, InterpreterConfig},
    environment::Environment,
    error::LoxError,
    parser::{parse, parse_unit, Unit},
    value::{Function, LoxFunction, Value},
};

pub type EvaluationResult = Result<Value, LoxError>;

/// How a statement finished.
///
/// `Return` travels outward through blocks, loops and branches until the
/// function call that owns it turns it back into a value.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

type ExecutionResult = Result<Flow, LoxError>;

/// Evaluates programs against one global scope.
///
/// Globals survive between calls, so a REPL can feed units one at a time.
/// `print` writes to `W`, stdout unless built with [Interpreter::with_output].
pub struct Interpreter<W: Write = io::Stdout> {
    globals: Rc<Environment>,
    config: InterpreterConfig,
    depth: usize,
    output: W,
}

impl Interpreter<io::Stdout> {
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> Interpreter<W> {
    pub fn with_output(output: W) -> Self {
        Self {
            globals: builtin_environment(),
            config: InterpreterConfig::default(),
            depth: 0,
            output,
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn globals(&self) -> &Rc<Environment> {
        &self.globals
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Parses and runs a whole program.
    pub fn run(&mut self, source: &str) -> Result<(), LoxError> {
        let statements = parse(source)?;
        self.interpret(&statements)
    }

    /// Parses and runs one interactive unit, returning the value of a bare
    /// expression.
    pub fn evaluate_str(&mut self, input: &str) -> Result<Option<Value>, LoxError> {
        let unit = parse_unit(input)?;
        self.execute_unit(&unit)
    }

    /// Runs top-level statements in the global scope, stopping at the first error.
    #[tracing::instrument(level = "debug", skip_all, fields(count = statements.len()))]
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        checker::check(statements)?;

        let globals = Rc::clone(&self.globals);
        for statement in statements {
            if let Flow::Return(_) = self.execute(statement, &globals)? {
                return Err(LoxError::syntax("cannot return from top-level code", statement.position));
            }
        }

        debug!("program finished");
        Ok(())
    }

    pub fn execute_unit(&mut self, unit: &Unit) -> Result<Option<Value>, LoxError> {
        match unit {
            Unit::Expression(expression) => {
                let globals = Rc::clone(&self.globals);
                self.evaluate(expression, &globals).map(Some)
            }
            Unit::Statements(statements) => self.interpret(statements).map(|_| None),
        }
    }

    fn execute_block(&mut self, statements: &[Stmt], environment: Rc<Environment>) -> ExecutionResult {
        for statement in statements {
            if let flow @ Flow::Return(_) = self.execute(statement, &environment)? {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn execute(&mut self, statement: &Stmt, environment: &Rc<Environment>) -> ExecutionResult {
        ensure_sufficient_stack(|| self.execute_statement(statement, environment))
    }

    fn execute_statement(&mut self, statement: &Stmt, environment: &Rc<Environment>) -> ExecutionResult {
        match &statement.kind {
            StmtKind::Expression(expression) => {
                self.evaluate(expression, environment)?;
            }
            StmtKind::Print(expression) => {
                let value = self.evaluate(expression, environment)?;
                writeln!(self.output, "{}", value).map_err(|error| LoxError::Output {
                    message: error.to_string(),
                    position: Some(statement.position),
                })?;
            }
            StmtKind::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer, environment)?,
                    None => Value::Nil,
                };
                environment.declare(name.as_str(), value);
            }
            StmtKind::Block(statements) => {
                return self.execute_block(statements, Environment::new(environment));
            }
            StmtKind::If { condition, then_branch, else_branch } => {
                if self.evaluate(condition, environment)?.is_truthy() {
                    return self.execute(then_branch, environment);
                }
                if let Some(else_branch) = else_branch {
                    return self.execute(else_branch, environment);
                }
            }
            StmtKind::While { condition, body } => {
                while self.evaluate(condition, environment)?.is_truthy() {
                    if let flow @ Flow::Return(_) = self.execute(body, environment)? {
                        return Ok(flow);
                    }
                }
            }
            StmtKind::For { initializer, condition, increment, body } => {
                let scope = Environment::new(environment);
                if let Some(initializer) = initializer {
                    self.execute(initializer, &scope)?;
                }

                loop {
                    if let Some(condition) = condition {
                        if !self.evaluate(condition, &scope)?.is_truthy() {
                            break;
                        }
                    }

                    // `{ body; increment; }` gets a fresh scope every iteration
                    let iteration = Environment::new(&scope);
                    if let flow @ Flow::Return(_) = self.execute(body, &iteration)? {
                        return Ok(flow);
                    }
                    if let Some(increment) = increment {
                        self.evaluate(increment, &iteration)?;
                    }
                }
            }
            StmtKind::Function(declaration) => {
                // The closure captures this very scope, so the function's own
                // name is already visible from its body once it is declared.
                let function = LoxFunction::new(Rc::clone(declaration), Rc::clone(environment));
                environment.declare(declaration.name.as_str(), Value::Function(Function::Lox(Rc::new(function))));
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(value) => self.evaluate(value, environment)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    pub fn evaluate(&mut self, expression: &Expr, environment: &Rc<Environment>) -> EvaluationResult {
        ensure_sufficient_stack(|| self.evaluate_expression(expression, environment))
    }

    fn evaluate_expression(&mut self, expression: &Expr, environment: &Rc<Environment>) -> EvaluationResult {
        let position = expression.position;
        match &expression.kind {
            ExprKind::Literal(literal) => Ok(match literal {
                Literal::Number(number) => Value::Number(*number),
                Literal::String(string) => Value::from(string.as_str()),
                Literal::Boolean(boolean) => Value::Boolean(*boolean),
                Literal::Nil => Value::Nil,
            }),
            ExprKind::Variable(name) => environment.get(name).map_err(|error| error.at(position)),
            ExprKind::Grouping(inner) => self.evaluate(inner, environment),
            ExprKind::Unary { operator, operand } => {
                let operand = self.evaluate(operand, environment)?;
                evaluate_unary(*operator, operand, position)
            }
            ExprKind::Binary { left, operator, right } => {
                let left = self.evaluate(left, environment)?;
                let right = self.evaluate(right, environment)?;
                evaluate_binary(*operator, left, right, position)
            }
            ExprKind::Logical { left, operator, right } => {
                let left = self.evaluate(left, environment)?;
                match (operator, left.is_truthy()) {
                    (LogicalOperator::And, false) | (LogicalOperator::Or, true) => Ok(left),
                    _ => self.evaluate(right, environment),
                }
            }
            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value, environment)?;
                environment.assign(name, value.clone()).map_err(|error| error.at(position))?;
                Ok(value)
            }
            ExprKind::Call { callee, arguments } => {
                let callee = self.evaluate(callee, environment)?;
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument, environment))
                    .collect::<Result<Vec<_>, _>>()?;

                match callee {
                    Value::Function(function) => self.call(&function, arguments, position),
                    other => Err(LoxError::type_error(
                        format!("can only call functions, got {}", other.type_name()),
                        position,
                    )),
                }
            }
        }
    }

    /// Checks arity, then runs `function` with `arguments`.
    fn call(&mut self, function: &Function, arguments: Vec<Value>, position: Position) -> EvaluationResult {
        if arguments.len() != function.arity() {
            return Err(LoxError::Arity {
                callee: function.name().to_owned(),
                expected: function.arity(),
                actual: arguments.len(),
                position: Some(position),
            });
        }

        match function {
            Function::Builtin(native) => (native.function)(&arguments, position),
            Function::Lox(function) => self.call_lox(function, arguments, position),
        }
    }

    fn call_lox(&mut self, function: &LoxFunction, arguments: Vec<Value>, position: Position) -> EvaluationResult {
        if self.depth >= self.config.max_call_depth {
            return Err(LoxError::ResourceExhausted {
                limit: self.config.max_call_depth,
                position: Some(position),
            });
        }

        let declaration = &function.declaration;
        trace!(name = %declaration.name, depth = self.depth, "call");

        // Parented to the closure, not the caller: scoping is lexical
        let environment = Environment::new(&function.closure);
        for (parameter, argument) in declaration.parameters.iter().zip(arguments) {
            environment.declare(parameter.as_str(), argument);
        }

        self.depth += 1;
        let flow = self.execute_block(&declaration.body, environment);
        self.depth -= 1;

        Ok(match flow? {
            Flow::Return(value) => value,
            Flow::Normal => Value::Nil,
        })
    }
}

fn evaluate_unary(operator: UnaryOperator, operand: Value, position: Position) -> EvaluationResult {
    match (operator, operand) {
        (UnaryOperator::Not, operand) => Ok(Value::Boolean(!operand.is_truthy())),
        (UnaryOperator::Negate, Value::Number(number)) => Ok(Value::Number(-number)),
        (UnaryOperator::Negate, other) => Err(LoxError::type_error(
            format!("operand of '-' must be a number, got {}", other.type_name()),
            position,
        )),
    }
}

fn evaluate_binary(operator: BinaryOperator, left: Value, right: Value, position: Position) -> EvaluationResult {
    use BinaryOperator::*;

    let (a, b) = match (operator, &left, &right) {
        (Equal, _, _) => return Ok(Value::Boolean(left == right)),
        (NotEqual, _, _) => return Ok(Value::Boolean(left != right)),
        (Add, Value::String(a), Value::String(b)) => return Ok(Value::from(format!("{}{}", a, b))),
        (_, Value::Number(a), Value::Number(b)) => (*a, *b),
        (Add, _, _) => {
            return Err(LoxError::type_error(
                format!(
                    "operands of '+' must be two numbers or two strings, got {} and {}",
                    left.type_name(),
                    right.type_name()
                ),
                position,
            ))
        }
        (_, Value::Number(_), offending) | (_, offending, _) => {
            return Err(LoxError::type_error(
                format!("operands of '{}' must be numbers, got {}", operator, offending.type_name()),
                position,
            ))
        }
    };

    Ok(match operator {
        Add => Value::Number(a + b),
        Subtract => Value::Number(a - b),
        Multiply => Value::Number(a * b),
        Divide | Remainder if b == 0.0 => return Err(LoxError::DivisionByZero { position: Some(position) }),
        Divide => Value::Number(a / b),
        Remainder => Value::Number(a % b),
        Less => Value::Boolean(a < b),
        LessEqual => Value::Boolean(a <= b),
        Greater => Value::Boolean(a > b),
        GreaterEqual => Value::Boolean(a >= b),
        Equal | NotEqual => unreachable!("equality is handled before the numeric check"),
    })
}
