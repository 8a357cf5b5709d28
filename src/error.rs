use thiserror::Error;

use crate::types::Column;

/// How a failure should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or insufficient input; retrying with more or different data can succeed.
    Validation,
    /// The input is well formed but the math has no defined answer.
    Degeneracy,
    /// Anything else: persistence, solver or configuration failure.
    Fatal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Validation => write!(f, "validation"),
            ErrorKind::Degeneracy => write!(f, "degeneracy"),
            ErrorKind::Fatal => write!(f, "fatal"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{indicator}: history is missing required column '{column}'")]
    MissingColumn { indicator: String, column: Column },

    #[error("column '{column}' has {got} rows, expected {expected}")]
    LengthMismatch { column: Column, expected: usize, got: usize },

    #[error("column '{column}' is only partially present (first gap at row {row})")]
    IncompleteColumn { column: Column, row: usize },

    #[error("Not enough rows for {agent}: need {needed}, got {got}")]
    InsufficientHistory { agent: String, needed: usize, got: usize },

    #[error("{agent} has not been fitted")]
    NotFitted { agent: String },

    #[error("{agent}: {reason}")]
    Degenerate { agent: String, reason: String },

    #[error("Unknown agent: {name}")]
    UnknownAgent { name: String },

    #[error("Model error: {0}")]
    Model(String),
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::MissingColumn { .. }
            | AgentError::LengthMismatch { .. }
            | AgentError::IncompleteColumn { .. }
            | AgentError::InsufficientHistory { .. }
            | AgentError::NotFitted { .. }
            | AgentError::UnknownAgent { .. } => ErrorKind::Validation,
            AgentError::Degenerate { .. } => ErrorKind::Degeneracy,
            AgentError::Model(_) => ErrorKind::Fatal,
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(err: serde_json::Error) -> Self {
        AgentError::Model(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
