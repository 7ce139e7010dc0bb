//! Error types for layout engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Invalid line break configuration: {0}")]
    InvalidConfig(String),

    #[error("Configuration could not be parsed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Math error: {0}")]
    Math(#[from] math::MathError),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
