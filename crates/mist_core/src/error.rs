//! Error types for Mist core.

use mist_store::StoreError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in Mist core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Document store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An import payload could not be parsed. The whole batch is rejected.
    #[error("unable to parse {format}: {message}")]
    Parse {
        /// Format that was being parsed, e.g. "Google CSV".
        format: &'static str,
        /// Description of the problem.
        message: String,
    },

    /// A document does not have the expected shape.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },

    /// JSON serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Creates a parse error.
    pub fn parse(format: &'static str, message: impl Into<String>) -> Self {
        Self::Parse {
            format,
            message: message.into(),
        }
    }

    /// Creates an invalid document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }

    /// Returns true if the error came from the document store.
    pub fn is_store(&self) -> bool {
        matches!(self, CoreError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_convert() {
        let err: CoreError = StoreError::unavailable("mist", "find documents").into();
        assert!(err.is_store());
        assert!(err.to_string().contains("mist"));
    }

    #[test]
    fn parse_error_display() {
        let err = CoreError::parse("Google CSV", "row 3 has 2 fields");
        assert_eq!(err.to_string(), "unable to parse Google CSV: row 3 has 2 fields");
    }
}
