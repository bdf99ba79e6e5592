//! Ownership-scoped data access.
//!
//! A [`Dao`] binds one collection of one database. It exposes two layers:
//!
//! - **raw** operations (`raw_*`) run the given filter as is and are meant
//!   for internal lookups such as authentication
//! - **scoped** operations take an owner id and thread it into every
//!   selector, so a caller never sees or touches documents it does not own
//!
//! Owner and document ids arrive as strings. A string that is not a valid
//! object id reads as "nothing there" (empty result, count 0) rather than
//! an error.

use std::sync::Arc;

use mist_store::{
    Connection, Document, Filter, InsertOutcome, ObjectId, Store, StoreError, Tail, Update,
    UpdateOutcome, ID_FIELD, OWNER_FIELD,
};
use tracing::{debug, warn};

use crate::error::CoreResult;

/// Outcome of [`Dao::update_checked`].
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateResult {
    /// The document changed; carries the modified count.
    Updated(u64),
    /// The document exists but the update changed nothing; carries the
    /// current document.
    Conflict(Document),
    /// No document with this id belongs to the owner.
    NotFound,
}

/// Access object for one collection.
#[derive(Debug, Clone)]
pub struct Dao {
    store: Store,
    collection: String,
    database: Option<String>,
}

impl Dao {
    /// Creates a Dao on the store's default database.
    ///
    /// The default is resolved at each call, so a Dao created before the
    /// store is opened works once it is.
    pub fn new(store: Store, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
            database: None,
        }
    }

    /// Binds the Dao to a named database instead of the default one.
    #[must_use]
    pub fn on_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Returns the collection name.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn connection(&self, operation: &'static str) -> CoreResult<Arc<dyn Connection>> {
        Ok(self.store.require(self.database.as_deref(), operation)?)
    }

    fn context(&self, operation: &'static str, filter: &Filter, error: StoreError) -> StoreError {
        if error.is_unavailable() {
            return error;
        }
        StoreError::operation(
            self.collection.clone(),
            operation,
            filter.to_string(),
            error.to_string(),
        )
    }

    // ---- raw operations ----

    /// Finds the first document matching `filter`, whoever owns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the read fails.
    pub fn raw_find_one(&self, filter: &Filter) -> CoreResult<Option<Document>> {
        const OP: &str = "searching one item";
        debug!(collection = %self.collection, selector = %filter, "find one");
        let conn = self.connection(OP)?;
        conn.find_one(&self.collection, filter)
            .map_err(|e| self.context(OP, filter, e).into())
    }

    /// Finds every document matching `filter`, whoever owns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the read fails.
    pub fn raw_find(&self, filter: &Filter) -> CoreResult<Vec<Document>> {
        const OP: &str = "searching items";
        debug!(collection = %self.collection, selector = %filter, "find");
        let conn = self.connection(OP)?;
        conn.find(&self.collection, filter)
            .map_err(|e| self.context(OP, filter, e).into())
    }

    /// Inserts documents as given.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be attempted. Rejected rows
    /// are reported in the outcome.
    pub fn raw_insert(
        &self,
        documents: Vec<Document>,
        continue_on_error: bool,
    ) -> CoreResult<InsertOutcome> {
        const OP: &str = "inserting items";
        debug!(collection = %self.collection, count = documents.len(), "insert");
        let conn = self.connection(OP)?;
        conn.insert(&self.collection, documents, continue_on_error)
            .map_err(|e| self.context(OP, &Filter::all(), e).into())
    }

    /// Updates the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    pub fn raw_update(&self, filter: &Filter, update: &Update) -> CoreResult<UpdateOutcome> {
        const OP: &str = "updating an item";
        debug!(collection = %self.collection, selector = %filter, %update, "update");
        let conn = self.connection(OP)?;
        conn.update(&self.collection, filter, update)
            .map_err(|e| self.context(OP, filter, e).into())
    }

    /// Removes every document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    pub fn raw_remove(&self, filter: &Filter) -> CoreResult<u64> {
        const OP: &str = "removing items";
        debug!(collection = %self.collection, selector = %filter, "remove");
        let conn = self.connection(OP)?;
        conn.remove(&self.collection, filter)
            .map_err(|e| self.context(OP, filter, e).into())
    }

    // ---- scoped operations ----

    /// Finds one document by id, only if `owner` owns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the read fails.
    pub fn find_by_id(&self, owner: &str, id: &str) -> CoreResult<Option<Document>> {
        match scoped_by_id(owner, id) {
            Some(filter) => self.raw_find_one(&filter),
            None => Ok(None),
        }
    }

    /// Finds the first of the owner's documents matching a query object.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the read fails.
    pub fn find_one(&self, owner: &str, query: Document) -> CoreResult<Option<Document>> {
        match parse_owner(owner) {
            Some(owner) => self.raw_find_one(&Filter::from_query(query).owned_by(owner)),
            None => Ok(None),
        }
    }

    /// Finds the owner's documents matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the read fails.
    pub fn find(&self, owner: &str, filter: Filter) -> CoreResult<Vec<Document>> {
        match parse_owner(owner) {
            Some(owner) => self.raw_find(&filter.owned_by(owner)),
            None => Ok(Vec::new()),
        }
    }

    /// Finds every document of the owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the read fails.
    pub fn find_all(&self, owner: &str) -> CoreResult<Vec<Document>> {
        self.find(owner, Filter::all())
    }

    /// Inserts documents on behalf of `owner`.
    ///
    /// Client ids are dropped and every document is stamped with the
    /// owner. Rows the store rejects are logged and skipped; the others are
    /// written. Returns the written documents with their ids.
    ///
    /// # Errors
    ///
    /// Returns an error only if the batch could not be attempted.
    pub fn insert(&self, owner: &str, documents: Vec<Document>) -> CoreResult<Vec<Document>> {
        let Some(owner) = parse_owner(owner) else {
            warn!(collection = %self.collection, "insert with an invalid owner ignored");
            return Ok(Vec::new());
        };
        let documents = documents
            .into_iter()
            .map(|mut doc| {
                doc.remove(ID_FIELD);
                doc.set_owner(owner);
                doc
            })
            .collect();

        let outcome = self.raw_insert(documents, true)?;
        for failure in &outcome.failures {
            warn!(
                collection = %self.collection,
                row = failure.index,
                reason = %failure.message,
                "row rejected during insert"
            );
        }
        Ok(outcome.inserted)
    }

    /// Merges `fields` into the owner's document `id`.
    ///
    /// Returns the number of modified documents: 0 both when the document
    /// does not exist for this owner and when it already holds every value.
    /// The owner field is never written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    pub fn update(&self, owner: &str, id: &str, mut fields: Document) -> CoreResult<u64> {
        let Some(filter) = scoped_by_id(owner, id) else {
            return Ok(0);
        };
        fields.remove(OWNER_FIELD);
        Ok(self.raw_update(&filter, &Update::Set(fields))?.modified)
    }

    /// Runs [`Dao::update`] and tells a conflict from a missing document.
    ///
    /// On a zero count the document is looked up again: found means the
    /// update had no effect ([`UpdateResult::Conflict`]), absent means
    /// [`UpdateResult::NotFound`]. The two calls are not atomic.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or a call fails.
    pub fn update_checked(&self, owner: &str, id: &str, fields: Document) -> CoreResult<UpdateResult> {
        let modified = self.update(owner, id, fields)?;
        if modified > 0 {
            return Ok(UpdateResult::Updated(modified));
        }
        Ok(match self.find_by_id(owner, id)? {
            Some(current) => UpdateResult::Conflict(current),
            None => UpdateResult::NotFound,
        })
    }

    /// Replaces the owner's document `id`, returning the matched count.
    ///
    /// The document keeps its id and is stamped with the owner again.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    pub fn replace(&self, owner: &str, id: &str, mut document: Document) -> CoreResult<u64> {
        let (Some(owner_id), Some(filter)) = (parse_owner(owner), scoped_by_id(owner, id)) else {
            return Ok(0);
        };
        document.set_owner(owner_id);
        Ok(self.raw_update(&filter, &Update::Replace(document))?.matched)
    }

    /// Removes the owner's document `id`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    pub fn remove(&self, owner: &str, id: &str) -> CoreResult<u64> {
        match scoped_by_id(owner, id) {
            Some(filter) => self.raw_remove(&filter),
            None => Ok(0),
        }
    }

    /// Tails the collection, yielding every document inserted from now on.
    ///
    /// This is a raw operation: documents of every owner are yielded.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    pub fn listen(&self) -> CoreResult<Tail> {
        Ok(self.store.tail(self.database.as_deref(), &self.collection)?)
    }
}

fn parse_owner(owner: &str) -> Option<ObjectId> {
    ObjectId::parse(owner).ok()
}

fn scoped_by_id(owner: &str, id: &str) -> Option<Filter> {
    let owner = parse_owner(owner)?;
    let id = ObjectId::parse(id).ok()?;
    Some(Filter::by_id(id).owned_by(owner))
}
