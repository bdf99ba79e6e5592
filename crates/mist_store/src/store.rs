//! Connection table.

use crate::config::{Databases, StoreConfig};
use crate::driver::{Address, Connection, Driver};
use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryDriver;
use crate::tail::Tail;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use tracing::{error, info, warn};

/// Handle to every open database connection.
///
/// Cloning a `Store` is cheap and every clone shares the same table. At
/// most one live connection exists per database name.
///
/// # Example
///
/// ```rust
/// use mist_store::Store;
///
/// let store = Store::in_memory();
/// store.open("localhost", 27017, ["mist", "archive"], Some("mist")).unwrap();
/// assert!(store.is_open("archive"));
///
/// store.close(None).unwrap();
/// assert!(store.connection(None).is_none());
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    driver: Arc<dyn Driver>,
    connections: RwLock<HashMap<String, Arc<dyn Connection>>>,
    default_database: RwLock<Option<String>>,
}

impl Store {
    /// Creates a store that opens connections through `driver`.
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                driver: Arc::new(driver),
                connections: RwLock::new(HashMap::new()),
                default_database: RwLock::new(None),
            }),
        }
    }

    /// Creates a store backed by a fresh [`MemoryDriver`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(MemoryDriver::new())
    }

    /// Opens one database or several at once.
    ///
    /// Opening a database that is already connected logs a warning and
    /// succeeds. A list of databases is opened concurrently; when some of
    /// them fail the others stay open and the error lists every failure.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Config`] if `host` is empty, `port` is 0 or a
    ///   database name is missing
    /// - [`StoreError::Open`] if a single database cannot be opened
    /// - [`StoreError::OpenMany`] if any database of a list cannot be opened
    pub fn open(
        &self,
        host: &str,
        port: u16,
        databases: impl Into<Databases>,
        default_database: Option<&str>,
    ) -> StoreResult<()> {
        if host.is_empty() {
            return Err(StoreError::config("undefined host"));
        }
        if port == 0 {
            return Err(StoreError::config("undefined port"));
        }
        let databases = databases.into();
        databases.validate()?;

        if let Some(name) = default_database {
            *self.inner.default_database.write() = Some(name.to_string());
        }

        let address = Address::new(host, port);
        match &databases {
            Databases::One(name) => self.open_one(&address, name),
            Databases::Many(names) => {
                let target = &address;
                let failures: Vec<StoreError> = thread::scope(|scope| {
                    let handles: Vec<_> = names
                        .iter()
                        .map(|name| scope.spawn(move || self.open_one(target, name)))
                        .collect();
                    handles
                        .into_iter()
                        .zip(names)
                        .filter_map(|(handle, name)| match handle.join() {
                            Ok(result) => result.err(),
                            Err(_) => Some(StoreError::Open {
                                database: name.clone(),
                                address: address.to_string(),
                                message: "open thread panicked".into(),
                            }),
                        })
                        .collect()
                });
                if failures.is_empty() {
                    Ok(())
                } else {
                    Err(StoreError::OpenMany {
                        address: address.to_string(),
                        failures,
                    })
                }
            }
        }
    }

    /// Opens the databases described by a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if host, port or database is missing,
    /// otherwise the errors of [`Store::open`].
    pub fn open_with(&self, config: &StoreConfig) -> StoreResult<()> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| StoreError::config("undefined host"))?;
        let port = config
            .port
            .ok_or_else(|| StoreError::config("undefined port"))?;
        let databases = config
            .database
            .clone()
            .ok_or_else(|| StoreError::config("undefined database"))?;
        self.open(host, port, databases, config.effective_default())
    }

    fn open_one(&self, address: &Address, name: &str) -> StoreResult<()> {
        if self.inner.connections.read().contains_key(name) {
            warn!(database = name, "database already opened");
            return Ok(());
        }

        let connection = self
            .inner
            .driver
            .connect(address, name)
            .map_err(|e| match e {
                open @ StoreError::Open { .. } => open,
                other => StoreError::Open {
                    database: name.to_string(),
                    address: address.to_string(),
                    message: other.to_string(),
                },
            })?;

        let mut connections = self.inner.connections.write();
        if connections.contains_key(name) {
            drop(connections);
            warn!(database = name, "database opened concurrently, dropping duplicate");
            if let Err(e) = connection.close() {
                warn!(database = name, error = %e, "failed to close duplicate connection");
            }
            return Ok(());
        }
        connections.insert(name.to_string(), connection);
        info!(database = name, %address, "database opened");
        Ok(())
    }

    /// Closes one database, or every database when `database` is `None`.
    ///
    /// Closing a database that is not open logs a warning and succeeds. The
    /// connection leaves the table even if the driver reports an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Close`] if the driver failed to close a
    /// connection; with several failures the first one is returned.
    pub fn close(&self, database: Option<&str>) -> StoreResult<()> {
        let Some(name) = database else {
            let drained: Vec<_> = self.inner.connections.write().drain().collect();
            let mut first_error = None;
            for (name, connection) in drained {
                if let Err(e) = Self::close_connection(&name, connection.as_ref()) {
                    error!(database = %name, error = %e, "failed to close database");
                    first_error.get_or_insert(e);
                }
            }
            return first_error.map_or(Ok(()), Err);
        };

        let removed = self.inner.connections.write().remove(name);
        match removed {
            Some(connection) => Self::close_connection(name, connection.as_ref()),
            None => {
                warn!(database = name, "database not opened");
                Ok(())
            }
        }
    }

    fn close_connection(name: &str, connection: &dyn Connection) -> StoreResult<()> {
        connection.close().map_err(|e| StoreError::Close {
            database: name.to_string(),
            message: e.to_string(),
        })?;
        info!(database = name, "database closed");
        Ok(())
    }

    /// Returns the live connection to `database`, or to the default
    /// database when `None`.
    ///
    /// Returns `None` both when the database was never opened and when
    /// its connection is currently disconnected.
    #[must_use]
    pub fn connection(&self, database: Option<&str>) -> Option<Arc<dyn Connection>> {
        let name = self.resolve(database)?;
        self.inner
            .connections
            .read()
            .get(&name)
            .filter(|c| c.is_connected())
            .cloned()
    }

    /// Like [`Store::connection`], reporting absence as an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ConnectionUnavailable`] naming `operation`.
    pub fn require(
        &self,
        database: Option<&str>,
        operation: &'static str,
    ) -> StoreResult<Arc<dyn Connection>> {
        self.connection(database).ok_or_else(|| {
            let name = self
                .resolve(database)
                .unwrap_or_else(|| "<default>".to_string());
            StoreError::unavailable(name, operation)
        })
    }

    /// Starts a tailing read of `collection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database has no live connection or the
    /// newest document cannot be read.
    pub fn tail(&self, database: Option<&str>, collection: &str) -> StoreResult<Tail> {
        let connection = self.require(database, "listen to new documents")?;
        Tail::new(connection, collection)
    }

    /// Returns the default database name.
    #[must_use]
    pub fn default_database(&self) -> Option<String> {
        self.inner.default_database.read().clone()
    }

    /// Returns true if `database` has an entry in the table, connected or not.
    #[must_use]
    pub fn is_open(&self, database: &str) -> bool {
        self.inner.connections.read().contains_key(database)
    }

    /// Returns the names of every database in the table.
    #[must_use]
    pub fn databases(&self) -> Vec<String> {
        let mut names: Vec<_> = self.inner.connections.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn resolve(&self, database: Option<&str>) -> Option<String> {
        database
            .map(ToString::to_string)
            .or_else(|| self.default_database())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("databases", &self.databases())
            .field("default_database", &self.default_database())
            .finish()
    }
}
