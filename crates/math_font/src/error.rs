//! Error types for math font metrics

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("Invalid metrics table: {0}")]
    InvalidTable(String),

    #[error("Font not found: {0}")]
    FontNotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, FontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FontError::InvalidTable("units_per_em is zero".to_string());
        assert_eq!(err.to_string(), "Invalid metrics table: units_per_em is zero");
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: FontError = json_err.into();
        assert!(matches!(err, FontError::Json(_)));
    }
}
