//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the document store adapter.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing or malformed connection arguments.
    #[error("unable to open database: {0}")]
    Config(String),

    /// No live connection for the database (never opened or disconnected).
    #[error("unable to get connection to \"{database}\" to {operation}")]
    ConnectionUnavailable {
        /// Database that was requested.
        database: String,
        /// Operation that needed the connection.
        operation: &'static str,
    },

    /// A single database could not be opened.
    #[error("unable to open database {database} on {address}: {message}")]
    Open {
        /// Database name.
        database: String,
        /// `host:port` of the server.
        address: String,
        /// Driver message.
        message: String,
    },

    /// One or more databases of a list could not be opened.
    #[error("unable to open multiple databases on {address}: {}", join_messages(.failures))]
    OpenMany {
        /// `host:port` of the server.
        address: String,
        /// Every individual failure.
        failures: Vec<StoreError>,
    },

    /// A connection could not be closed cleanly.
    #[error("unable to close database {database}: {message}")]
    Close {
        /// Database name.
        database: String,
        /// Driver message.
        message: String,
    },

    /// A collection operation failed on the server.
    #[error("error while {operation} in {collection} matching {selector}: {message}")]
    Operation {
        /// Collection name.
        collection: String,
        /// Human readable operation, e.g. "searching one item".
        operation: &'static str,
        /// The selector that was used.
        selector: String,
        /// Driver message.
        message: String,
    },

    /// A string is not a valid object id.
    #[error("invalid object id: {0:?}")]
    InvalidId(String),
}

impl StoreError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a connection unavailable error.
    pub fn unavailable(database: impl Into<String>, operation: &'static str) -> Self {
        Self::ConnectionUnavailable {
            database: database.into(),
            operation,
        }
    }

    /// Creates an operation error with its query context.
    pub fn operation(
        collection: impl Into<String>,
        operation: &'static str,
        selector: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Operation {
            collection: collection.into(),
            operation,
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error means no connection could be used.
    ///
    /// These errors are transient from the point of view of a tailing read.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::ConnectionUnavailable { .. })
    }
}

fn join_messages(failures: &[StoreError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
