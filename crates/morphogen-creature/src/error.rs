//! Errors raised while decoding or recombining genetic material

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeneticError {
    #[error("Malformed genetic input: {reason}")]
    MalformedInput { reason: String },

    #[error("Invalid gene length: expected {expected} bases, got {actual}")]
    InvalidGeneLength { expected: usize, actual: usize },
}

impl GeneticError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeneticError>;
