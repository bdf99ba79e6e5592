//! Error types for the API server.

use http::StatusCode;
use mist_core::CoreError;
use mist_store::{Document, StoreError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the API server.
///
/// Every variant maps to one HTTP status, see [`ServerError::status`].
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid configuration. Aborts startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed request body.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing, invalid or expired token, or bad credentials.
    #[error("not authorized: {0}")]
    NotAuthorized(String),

    /// No such route, or no such document for the caller.
    #[error("{0}")]
    NotFound(String),

    /// The update changed nothing but the document exists.
    ///
    /// Carries the current document, which becomes the response body.
    #[error("conflict on document {}", .0.id().map(|id| id.to_hex()).unwrap_or_default())]
    Conflict(Document),

    /// The resource would duplicate an existing one.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// No acceptable representation for the `Accept` header.
    #[error("not acceptable: {0}")]
    NotAcceptable(String),

    /// Unsupported import content type.
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// Returns the HTTP status reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::Conflict(_) | ServerError::AlreadyExists(_) => StatusCode::CONFLICT,
            ServerError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            ServerError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ServerError::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::Config(_) | ServerError::Internal(_) | ServerError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns true if this is a client error (4xx).
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl From<StoreError> for ServerError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Config(message) => ServerError::Config(message),
            other => ServerError::Database(other.to_string()),
        }
    }
}

impl From<CoreError> for ServerError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Store(store) => store.into(),
            CoreError::Parse { .. } | CoreError::InvalidDocument { .. } => {
                ServerError::InvalidRequest(error.to_string())
            }
            CoreError::Serialization(e) => ServerError::Internal(e.to_string()),
        }
    }
}
