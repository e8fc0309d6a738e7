//! Error types shared by every layer of the engine.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Category of a fault, independent of its message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexical,
    Syntax,
    Semantic,
    Type,
    Constraint,
    Arithmetic,
    ResourceLimit,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Unrecognized character or unterminated literal.
    #[error("lexical error at offset {offset}: {message}")]
    Lexical { offset: usize, message: String },

    /// A token that cannot extend the current production.
    #[error("syntax error at offset {offset}: unexpected {found}, expected {expected}")]
    Syntax {
        offset: usize,
        found: String,
        expected: String,
    },

    /// Unknown or duplicate table/column, arity mismatch.
    #[error("semantic error: {0}")]
    Semantic(String),

    #[error("type error: {0}")]
    Type(String),

    /// Primary-key violation.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("resource limit exceeded: {0}")]
    ResourceLimit(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Lexical { .. } => ErrorKind::Lexical,
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::Semantic(_) => ErrorKind::Semantic,
            Self::Type(_) => ErrorKind::Type,
            Self::Constraint(_) => ErrorKind::Constraint,
            Self::Arithmetic(_) => ErrorKind::Arithmetic,
            Self::ResourceLimit(_) => ErrorKind::ResourceLimit,
        }
    }

    pub(crate) fn semantic(message: impl Into<String>) -> Self {
        Self::Semantic(message.into())
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub(crate) fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint(message.into())
    }
}
