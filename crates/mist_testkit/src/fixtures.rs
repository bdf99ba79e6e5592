//! Test fixtures and store helpers.

use std::io::Write;

use mist_core::Dao;
use mist_store::{Document, MemoryDriver, ObjectId, Store};
use tempfile::NamedTempFile;

/// Database opened by [`TestStore`].
pub const TEST_DATABASE: &str = "mist_test";

/// An in-memory store, already opened on [`TEST_DATABASE`].
///
/// The driver handle stays reachable so tests can refuse connections or
/// take the database offline.
pub struct TestStore {
    /// The opened store.
    pub store: Store,
    /// The driver behind `store`.
    pub driver: MemoryDriver,
}

impl TestStore {
    /// Creates a store opened on [`TEST_DATABASE`], which is also the
    /// default database.
    pub fn memory() -> Self {
        let driver = MemoryDriver::new();
        let store = Store::new(driver.clone());
        store
            .open("localhost", 27017, TEST_DATABASE, Some(TEST_DATABASE))
            .expect("Failed to open in-memory store");
        Self { store, driver }
    }

    /// Returns a Dao on `collection` of the default database.
    pub fn dao(&self, collection: &str) -> Dao {
        Dao::new(self.store.clone(), collection)
    }

    /// Returns a fresh owner id.
    pub fn owner() -> String {
        ObjectId::new().to_hex()
    }

    /// Takes the test database offline or back online.
    pub fn set_online(&self, online: bool) {
        self.driver.set_online(TEST_DATABASE, online);
    }

    /// Returns the number of documents stored in `collection`, all owners
    /// included.
    pub fn count(&self, collection: &str) -> usize {
        self.driver.document_count(TEST_DATABASE, collection)
    }
}

impl std::ops::Deref for TestStore {
    type Target = Store;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Builds a document from a JSON object literal.
///
/// # Panics
///
/// Panics if `value` is not an object.
pub fn doc(value: serde_json::Value) -> Document {
    Document::from_value(value).expect("Document must be a JSON object")
}

/// Writes `contents` to a temporary file that lives as long as the handle.
pub fn temp_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp file");
    file
}
