//! Selectors and write descriptions understood by drivers.

use crate::document::{Document, ID_FIELD, OWNER_FIELD};
use crate::id::ObjectId;
use serde_json::{json, Map, Value};
use std::fmt;

/// A single condition of a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The field equals the value.
    Eq(String, Value),
    /// The field is present (`true`) or absent (`false`).
    Exists(String, bool),
    /// The document id is strictly greater than the given id.
    IdAfter(ObjectId),
}

impl Condition {
    /// Returns true if the document satisfies this condition.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Condition::Eq(field, value) => doc.get(field) == Some(value),
            Condition::Exists(field, present) => doc.contains(field) == *present,
            Condition::IdAfter(after) => doc.id().is_some_and(|id| id > *after),
        }
    }
}

/// A conjunction of conditions. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Creates a filter matching every document.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a filter matching one document id.
    #[must_use]
    pub fn by_id(id: ObjectId) -> Self {
        Self::all().eq(ID_FIELD, id.to_hex())
    }

    /// Creates an equality filter from a query object.
    #[must_use]
    pub fn from_query(query: Document) -> Self {
        let conditions = query
            .into_map()
            .into_iter()
            .map(|(field, value)| Condition::Eq(field, value))
            .collect();
        Self { conditions }
    }

    /// Adds a `field == value` condition.
    #[must_use]
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions
            .push(Condition::Eq(field.into(), value.into()));
        self
    }

    /// Adds a presence condition.
    #[must_use]
    pub fn exists(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::Exists(field.into(), true));
        self
    }

    /// Adds an absence condition.
    #[must_use]
    pub fn missing(mut self, field: impl Into<String>) -> Self {
        self.conditions.push(Condition::Exists(field.into(), false));
        self
    }

    /// Adds an `_id > after` condition.
    #[must_use]
    pub fn after(mut self, after: ObjectId) -> Self {
        self.conditions.push(Condition::IdAfter(after));
        self
    }

    /// Restricts the filter to documents owned by `owner`.
    ///
    /// Any owner condition already present is replaced so a caller-built
    /// query can never widen the scope.
    #[must_use]
    pub fn owned_by(mut self, owner: ObjectId) -> Self {
        self.conditions.retain(|c| {
            !matches!(c, Condition::Eq(field, _) | Condition::Exists(field, _) if field == OWNER_FIELD)
        });
        self.eq(OWNER_FIELD, owner.to_hex())
    }

    /// Returns the conditions.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns true if the document satisfies every condition.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }

    /// Renders the filter as a selector object, used for logs and errors.
    #[must_use]
    pub fn to_selector(&self) -> Value {
        let mut selector = Map::new();
        for condition in &self.conditions {
            match condition {
                Condition::Eq(field, value) => {
                    selector.insert(field.clone(), value.clone());
                }
                Condition::Exists(field, present) => {
                    selector.insert(field.clone(), json!({ "$exists": present }));
                }
                Condition::IdAfter(after) => {
                    selector.insert(ID_FIELD.to_string(), json!({ "$gt": after.to_hex() }));
                }
            }
        }
        Value::Object(selector)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_selector())
    }
}

/// How an update changes the matched document.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Replaces only the named fields (`$set`).
    Set(Document),
    /// Replaces the whole document, keeping its `_id`.
    Replace(Document),
}

impl Update {
    /// Applies the update to a document, returning true if anything changed.
    pub fn apply(&self, target: &mut Document) -> bool {
        match self {
            Update::Set(fields) => {
                let mut changed = false;
                for (field, value) in fields.iter() {
                    if field == ID_FIELD {
                        continue;
                    }
                    if target.get(field) != Some(value) {
                        target.insert(field.clone(), value.clone());
                        changed = true;
                    }
                }
                changed
            }
            Update::Replace(replacement) => {
                let mut next = replacement.clone();
                next.remove(ID_FIELD);
                if let Some(id) = target.id() {
                    next.set_id(id);
                }
                if next == *target {
                    return false;
                }
                *target = next;
                true
            }
        }
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Set(fields) => write!(f, "{}", json!({ "$set": fields })),
            Update::Replace(doc) => write!(f, "{}", json!(doc)),
        }
    }
}

/// Result of an update: how many documents matched and how many changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Documents matching the filter.
    pub matched: u64,
    /// Documents whose content actually changed.
    pub modified: u64,
}

/// A row rejected during a bulk insert.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    /// Position of the row in the submitted batch.
    pub index: usize,
    /// Reason for rejection.
    pub message: String,
}

/// Result of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOutcome {
    /// Documents written, with their assigned ids, in batch order.
    pub inserted: Vec<Document>,
    /// Rows that were rejected.
    pub failures: Vec<RowFailure>,
}
