use core::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::ast::Position;

/// Classification of a [LoxError], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum ErrorKind {
    Syntax,
    UndefinedVariable,
    Type,
    DivisionByZero,
    Arity,
    ResourceExhausted,
    Output,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "SyntaxError",
            Self::UndefinedVariable => "UndefinedVariable",
            Self::Type => "TypeError",
            Self::DivisionByZero => "DivisionByZero",
            Self::Arity => "ArityError",
            Self::ResourceExhausted => "ResourceExhausted",
            Self::Output => "OutputError",
        })
    }
}

/// Renders the `[line L:C] ` prefix, or nothing when the position is unknown.
struct Location(Option<Position>);

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(position) => write!(f, "[line {}] ", position),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoxError {
    #[error("{}SyntaxError: {message}", Location(*.position))]
    Syntax {
        message: String,
        position: Option<Position>,
    },

    #[error("{}UndefinedVariable: undefined variable '{name}'", Location(*.position))]
    UndefinedVariable {
        name: String,
        position: Option<Position>,
    },

    #[error("{}TypeError: {message}", Location(*.position))]
    Type {
        message: String,
        position: Option<Position>,
    },

    #[error("{}DivisionByZero: division by zero", Location(*.position))]
    DivisionByZero { position: Option<Position> },

    #[error("{}ArityError: {callee} expected {expected} arguments but got {actual}", Location(*.position))]
    Arity {
        callee: String,
        expected: usize,
        actual: usize,
        position: Option<Position>,
    },

    #[error("{}ResourceExhausted: call depth exceeded {limit}", Location(*.position))]
    ResourceExhausted {
        limit: usize,
        position: Option<Position>,
    },

    /// The `print` sink refused a write.
    #[error("{}OutputError: {message}", Location(*.position))]
    Output {
        message: String,
        position: Option<Position>,
    },
}

impl LoxError {
    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        Self::Syntax { message: message.into(), position: Some(position) }
    }

    pub fn type_error(message: impl Into<String>, position: Position) -> Self {
        Self::Type { message: message.into(), position: Some(position) }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::UndefinedVariable { .. } => ErrorKind::UndefinedVariable,
            Self::Type { .. } => ErrorKind::Type,
            Self::DivisionByZero { .. } => ErrorKind::DivisionByZero,
            Self::Arity { .. } => ErrorKind::Arity,
            Self::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            Self::Output { .. } => ErrorKind::Output,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Syntax { position, .. }
            | Self::UndefinedVariable { position, .. }
            | Self::Type { position, .. }
            | Self::DivisionByZero { position }
            | Self::Arity { position, .. }
            | Self::ResourceExhausted { position, .. }
            | Self::Output { position, .. } => *position,
        }
    }

    /// Fills in a position for errors raised where none was known, such as
    /// lookups inside an [Environment](crate::environment::Environment).
    pub(crate) fn at(mut self, at: Position) -> Self {
        match &mut self {
            Self::Syntax { position, .. }
            | Self::UndefinedVariable { position, .. }
            | Self::Type { position, .. }
            | Self::DivisionByZero { position }
            | Self::Arity { position, .. }
            | Self::ResourceExhausted { position, .. }
            | Self::Output { position, .. } => {
                position.get_or_insert(at);
            }
        }
        self
    }
}
