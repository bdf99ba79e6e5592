//! In-memory driver.

use crate::change_feed::ChangeFeed;
use crate::document::{Document, ID_FIELD};
use crate::driver::{Address, Connection, ConnectionState, Driver};
use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, InsertOutcome, RowFailure, Update, UpdateOutcome};
use crate::id::ObjectId;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::error;

/// An in-process driver keeping every database in memory.
///
/// This driver is suitable for:
/// - Unit and integration tests
/// - Single-process deployments that don't need persistence
///
/// Databases outlive connections: closing and reopening a database sees
/// the same documents. Cloning the driver shares its databases, which lets
/// tests keep a handle after giving the driver to a [`crate::Store`].
///
/// # Example
///
/// ```rust
/// use mist_store::{Store, MemoryDriver};
///
/// let driver = MemoryDriver::new();
/// let store = Store::new(driver.clone());
/// store.open("localhost", 27017, "mist", Some("mist")).unwrap();
/// assert!(store.connection(None).is_some());
/// ```
#[derive(Clone, Default)]
pub struct MemoryDriver {
    inner: Arc<DriverState>,
}

#[derive(Default)]
struct DriverState {
    databases: Mutex<HashMap<String, Arc<MemoryDatabase>>>,
    refused: RwLock<HashSet<String>>,
}

struct MemoryDatabase {
    collections: RwLock<HashMap<String, Vec<Document>>>,
    online: AtomicBool,
}

impl MemoryDatabase {
    fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }
}

impl MemoryDriver {
    /// Creates a driver with no databases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes future connections to `database` fail.
    pub fn refuse(&self, database: &str) {
        self.inner.refused.write().insert(database.to_string());
    }

    /// Accepts connections to `database` again.
    pub fn accept(&self, database: &str) {
        self.inner.refused.write().remove(database);
    }

    /// Simulates losing (`false`) or regaining (`true`) the network link
    /// to `database`.
    pub fn set_online(&self, database: &str, online: bool) {
        let db = self.database(database);
        db.online.store(online, Ordering::SeqCst);
        if !online {
            error!(database, "connection to database lost");
        }
    }

    /// Returns the number of documents stored in a collection.
    #[must_use]
    pub fn document_count(&self, database: &str, collection: &str) -> usize {
        self.database(database)
            .collections
            .read()
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn database(&self, name: &str) -> Arc<MemoryDatabase> {
        let mut databases = self.inner.databases.lock();
        Arc::clone(
            databases
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryDatabase::new())),
        )
    }
}

impl Driver for MemoryDriver {
    fn connect(&self, address: &Address, database: &str) -> StoreResult<Arc<dyn Connection>> {
        if self.inner.refused.read().contains(database) {
            return Err(StoreError::Open {
                database: database.to_string(),
                address: address.to_string(),
                message: "connection refused".into(),
            });
        }
        Ok(Arc::new(MemoryConnection {
            database: database.to_string(),
            db: self.database(database),
            feed: ChangeFeed::new(),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A connection to one in-memory database.
pub struct MemoryConnection {
    database: String,
    db: Arc<MemoryDatabase>,
    feed: ChangeFeed,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn ensure_usable(&self, operation: &'static str) -> StoreResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(StoreError::unavailable(self.database.clone(), operation))
        }
    }

    fn check_row(
        existing: &HashSet<ObjectId>,
        doc: &mut Document,
    ) -> Result<ObjectId, String> {
        if let Some(field) = doc.iter().map(|(k, _)| k).find(|k| k.starts_with('$')) {
            return Err(format!("field name {field:?} cannot start with '$'"));
        }
        let id = match doc.get(ID_FIELD) {
            None => {
                let id = ObjectId::new();
                doc.set_id(id);
                id
            }
            Some(Value::String(text)) => ObjectId::parse(text).map_err(|e| e.to_string())?,
            Some(other) => return Err(format!("invalid _id {other}")),
        };
        if existing.contains(&id) {
            return Err(format!("duplicate key _id {id}"));
        }
        Ok(id)
    }
}

impl Connection for MemoryConnection {
    fn database(&self) -> &str {
        &self.database
    }

    fn state(&self) -> ConnectionState {
        if self.closed.load(Ordering::SeqCst) {
            ConnectionState::Closed
        } else if self.db.online.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    fn find(&self, collection: &str, filter: &Filter) -> StoreResult<Vec<Document>> {
        self.ensure_usable("find documents")?;
        let collections = self.db.collections.read();
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    fn latest(&self, collection: &str) -> StoreResult<Option<Document>> {
        self.ensure_usable("find the latest document")?;
        let collections = self.db.collections.read();
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.last().cloned()))
    }

    fn insert(
        &self,
        collection: &str,
        documents: Vec<Document>,
        continue_on_error: bool,
    ) -> StoreResult<InsertOutcome> {
        self.ensure_usable("insert documents")?;
        let mut outcome = InsertOutcome::default();
        {
            let mut collections = self.db.collections.write();
            let docs = collections.entry(collection.to_string()).or_default();
            let mut existing: HashSet<ObjectId> = docs.iter().filter_map(Document::id).collect();

            for (index, mut doc) in documents.into_iter().enumerate() {
                match Self::check_row(&existing, &mut doc) {
                    Ok(id) => {
                        existing.insert(id);
                        docs.push(doc.clone());
                        outcome.inserted.push(doc);
                    }
                    Err(message) => {
                        outcome.failures.push(RowFailure { index, message });
                        if !continue_on_error {
                            break;
                        }
                    }
                }
            }
        }
        for doc in &outcome.inserted {
            self.feed.emit(collection, doc);
        }
        Ok(outcome)
    }

    fn update(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> StoreResult<UpdateOutcome> {
        self.ensure_usable("update documents")?;
        let mut collections = self.db.collections.write();
        let Some(target) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| filter.matches(d)))
        else {
            return Ok(UpdateOutcome::default());
        };
        let modified = u64::from(update.apply(target));
        Ok(UpdateOutcome {
            matched: 1,
            modified,
        })
    }

    fn remove(&self, collection: &str, filter: &Filter) -> StoreResult<u64> {
        self.ensure_usable("remove documents")?;
        let mut collections = self.db.collections.write();
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        Ok((before - docs.len()) as u64)
    }

    fn subscribe(&self, collection: &str) -> StoreResult<Receiver<Document>> {
        self.ensure_usable("listen to new documents")?;
        Ok(self.feed.subscribe(collection))
    }

    fn close(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.feed.close();
        Ok(())
    }
}
