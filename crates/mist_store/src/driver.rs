//! Driver and connection traits.

use crate::document::Document;
use crate::error::StoreResult;
use crate::filter::{Filter, InsertOutcome, Update, UpdateOutcome};
use std::fmt;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Network address of a database server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    /// Host name or IP address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Address {
    /// Creates a new address.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// The connection can serve requests.
    Connected,
    /// The connection lost the server and may recover on its own.
    Disconnected,
    /// The connection was closed and will never serve requests again.
    Closed,
}

/// Opens connections to named databases.
///
/// Implement this trait to plug a real database client in. The crate ships
/// [`crate::MemoryDriver`], an in-process implementation.
pub trait Driver: Send + Sync {
    /// Connects to `database` on the server at `address`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or refuses the
    /// connection.
    fn connect(&self, address: &Address, database: &str) -> StoreResult<Arc<dyn Connection>>;
}

/// A live connection to one database.
///
/// Every method operates on a single collection and is atomic on its own;
/// there are no multi-document transactions.
///
/// # Invariants
///
/// - `insert` assigns an `_id` to documents that have none
/// - `update` touches at most one document
/// - documents are returned in natural (insert) order
pub trait Connection: Send + Sync {
    /// Returns the database name.
    fn database(&self) -> &str;

    /// Returns the current connection state.
    fn state(&self) -> ConnectionState;

    /// Returns true if the connection can serve requests right now.
    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Returns every document of `collection` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not usable or the read fails.
    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>>;

    /// Returns the first document of `collection` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not usable or the read fails.
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        Ok(self.find(collection, filter)?.into_iter().next())
    }

    /// Returns the most recently inserted document of `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not usable or the read fails.
    fn latest(&self, collection: &str) -> StoreResult<Option<Document>>;

    /// Inserts documents.
    ///
    /// With `continue_on_error`, rejected rows are reported in the outcome
    /// and the remaining rows are still written; without it the insert
    /// stops at the first rejected row.
    ///
    /// # Errors
    ///
    /// Returns an error only if the batch could not be attempted at all.
    fn insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
        continue_on_error: bool,
    ) -> StoreResult<InsertOutcome>;

    /// Updates the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not usable or the write fails.
    fn update(&self, collection: &str, filter: &Filter, update: &Update)
        -> StoreResult<UpdateOutcome>;

    /// Removes every document matching `filter`, returning how many.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not usable or the write fails.
    fn remove(&self, collection: &str, filter: &Filter) -> StoreResult<u64>;

    /// Subscribes to documents inserted into `collection` from now on.
    ///
    /// The receiver disconnects when the connection is closed.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is not usable.
    fn subscribe(&self, collection: &str) -> StoreResult<Receiver<Document>>;

    /// Closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the server did not acknowledge the close. The
    /// connection is unusable afterwards either way.
    fn close(&self) -> StoreResult<()>;
}
