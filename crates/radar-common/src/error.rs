//! Error types for radar-metadb services.

use thiserror::Error;

/// Result type alias using RadarError.
pub type RadarResult<T> = Result<T, RadarError>;

/// Primary error type for metadata database operations.
#[derive(Debug, Error)]
pub enum RadarError {
    // === Constraint violations ===
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Integrity violation: {0}")]
    Integrity(String),

    // === Lookup failures ===
    #[error("Not found: {0}")]
    Lookup(String),

    // === Query language errors ===
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Invalid value: {0}")]
    Value(String),

    // === Infrastructure errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RadarError {
    /// Get the HTTP status code a REST boundary would map this error to.
    pub fn http_status_code(&self) -> u16 {
        match self {
            RadarError::DuplicateEntry(_) | RadarError::Integrity(_) => 409,
            RadarError::Lookup(_) => 404,
            RadarError::Evaluation(_) | RadarError::Value(_) => 400,
            _ => 500,
        }
    }

    /// True for errors that represent a client mistake rather than a
    /// server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self.http_status_code(), 400..=499)
    }
}

impl From<serde_json::Error> for RadarError {
    fn from(err: serde_json::Error) -> Self {
        RadarError::Value(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(RadarError::DuplicateEntry("x".into()).http_status_code(), 409);
        assert_eq!(RadarError::Integrity("x".into()).http_status_code(), 409);
        assert_eq!(RadarError::Lookup("x".into()).http_status_code(), 404);
        assert_eq!(RadarError::Evaluation("x".into()).http_status_code(), 400);
        assert_eq!(RadarError::Value("x".into()).http_status_code(), 400);
        assert_eq!(RadarError::Database("x".into()).http_status_code(), 500);
    }

    #[test]
    fn test_client_error_split() {
        assert!(RadarError::Lookup("x".into()).is_client_error());
        assert!(!RadarError::Storage("x".into()).is_client_error());
    }
}
