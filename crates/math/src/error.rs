//! Error types for the math crate

use thiserror::Error;

/// Errors that can occur in math operations
#[derive(Error, Debug)]
pub enum MathError {
    /// An atom that cannot be laid out; typesetting substitutes an empty box
    #[error("Malformed {kind} atom: {reason}")]
    MalformedAtom { kind: String, reason: String },

    /// Invalid math structure
    #[error("Invalid math structure: {0}")]
    InvalidStructure(String),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MathError {
    pub fn malformed(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAtom {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for math operations
pub type MathResult<T> = Result<T, MathError>;
