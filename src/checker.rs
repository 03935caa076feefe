use crate::{
    ast::{Stmt, StmtKind},
    config::ensure_sufficient_stack,
    error::LoxError,
};

/// Rejects `return` statements that are not inside a function body.
///
/// Runs before evaluation so a misplaced `return` fails the whole unit up
/// front instead of after earlier statements have had side effects.
pub fn check(statements: &[Stmt]) -> Result<(), LoxError> {
    statements.iter().try_for_each(|statement| check_statement(statement, false))
}

fn check_statement(statement: &Stmt, in_function: bool) -> Result<(), LoxError> {
    ensure_sufficient_stack(|| check_kind(statement, in_function))
}

fn check_kind(statement: &Stmt, in_function: bool) -> Result<(), LoxError> {
    match &statement.kind {
        StmtKind::Return(_) if !in_function => {
            Err(LoxError::syntax("cannot return from top-level code", statement.position))
        }
        StmtKind::Block(statements) => statements
            .iter()
            .try_for_each(|statement| check_statement(statement, in_function)),
        StmtKind::If { then_branch, else_branch, .. } => {
            check_statement(then_branch, in_function)?;
            match else_branch {
                Some(else_branch) => check_statement(else_branch, in_function),
                None => Ok(()),
            }
        }
        StmtKind::While { body, .. } => check_statement(body, in_function),
        StmtKind::For { initializer, body, .. } => {
            if let Some(initializer) = initializer {
                check_statement(initializer, in_function)?;
            }
            check_statement(body, in_function)
        }
        StmtKind::Function(declaration) => declaration
            .body
            .iter()
            .try_for_each(|statement| check_statement(statement, true)),
        StmtKind::Return(_)
        | StmtKind::Expression(_)
        | StmtKind::Print(_)
        | StmtKind::Var { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use crate::{ast::Position, error::ErrorKind, parser::parse};

    use super::*;

    #[test]
    fn return_inside_function_is_allowed() -> anyhow::Result<()> {
        check(&parse("fun f() { if (true) { while (false) return 1; } return; }")?)?;
        Ok(())
    }

    #[test]
    fn top_level_return_is_rejected() -> anyhow::Result<()> {
        let error = check(&parse("print 1;\n{ return 2; }")?).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Syntax);
        assert_eq!(error.position(), Some(Position::new(2, 3)));
        Ok(())
    }

    #[test]
    fn return_in_loop_body_outside_function_is_rejected() -> anyhow::Result<()> {
        let error = check(&parse("for (;;) return;")?).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::Syntax);
        Ok(())
    }
}
