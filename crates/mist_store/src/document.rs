//! Stored documents.

use crate::id::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved field holding the document identifier.
pub const ID_FIELD: &str = "_id";

/// Reserved field holding the identifier of the owning user.
pub const OWNER_FIELD: &str = "_user";

/// A document: a JSON object with two reserved fields.
///
/// - `_id`: object id in hex form, assigned by the store on insert
/// - `_user`: owner id in hex form, stamped by scoped inserts
///
/// Neither reserved field is interpreted by the document itself; the
/// store and the ownership layer enforce their invariants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// Creates an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing JSON object.
    #[must_use]
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Converts a JSON value into a document.
    ///
    /// Returns `None` if the value is not an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consumes the document and returns the underlying JSON object.
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Consumes the document and returns it as a JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Returns a field value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns a string field value.
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Returns true if the field is present.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Iterates over fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the document has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the document id, if present and well formed.
    #[must_use]
    pub fn id(&self) -> Option<ObjectId> {
        self.get_str(ID_FIELD).and_then(|s| ObjectId::parse(s).ok())
    }

    /// Sets the document id.
    pub fn set_id(&mut self, id: ObjectId) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.to_hex()));
    }

    /// Returns the owner id, if present.
    #[must_use]
    pub fn owner(&self) -> Option<&str> {
        self.get_str(OWNER_FIELD)
    }

    /// Sets the owner id.
    pub fn set_owner(&mut self, owner: ObjectId) {
        self.0
            .insert(OWNER_FIELD.to_string(), Value::String(owner.to_hex()));
    }

    /// Removes both reserved fields.
    ///
    /// Write bodies coming from clients go through this before reaching
    /// an update or replace.
    pub fn strip_identity(&mut self) {
        self.0.remove(ID_FIELD);
        self.0.remove(OWNER_FIELD);
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        doc.into_value()
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_value_requires_object() {
        assert!(Document::from_value(json!({"a": 1})).is_some());
        assert!(Document::from_value(json!([1, 2])).is_none());
        assert!(Document::from_value(json!("text")).is_none());
    }

    #[test]
    fn identity_fields() {
        let mut doc = Document::new();
        assert!(doc.id().is_none());

        let id = ObjectId::new();
        let owner = ObjectId::new();
        doc.set_id(id);
        doc.set_owner(owner);
        doc.insert("title", "hello");

        assert_eq!(doc.id(), Some(id));
        assert_eq!(doc.owner(), Some(owner.to_hex().as_str()));

        doc.strip_identity();
        assert!(!doc.contains(ID_FIELD));
        assert!(!doc.contains(OWNER_FIELD));
        assert_eq!(doc.get_str("title"), Some("hello"));
    }

    #[test]
    fn malformed_id_reads_as_absent() {
        let mut doc = Document::new();
        doc.insert(ID_FIELD, "nope");
        assert!(doc.id().is_none());
    }

    #[test]
    fn serializes_transparently() {
        let mut doc = Document::new();
        doc.insert("a", 1);
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"a": 1}));
    }
}
