//! Tailing reads.
//!
//! A [`Tail`] yields every document inserted into a collection after the
//! tail was created, for as long as its connection stays open. Network
//! loss and read errors are logged and retried after a fixed delay; the
//! iterator only ends once the connection is closed.

use crate::document::Document;
use crate::driver::{Connection, ConnectionState};
use crate::error::{StoreError, StoreResult};
use crate::filter::Filter;
use crate::id::ObjectId;
use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Delay before retrying after a failure.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// How long a tail blocks before re-checking its connection.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A blocking, infinite iterator over newly inserted documents.
pub struct Tail {
    connection: Arc<dyn Connection>,
    collection: String,
    last: Option<ObjectId>,
    receiver: Option<Receiver<Document>>,
    pending: VecDeque<Document>,
    retry_delay: Duration,
    poll_interval: Duration,
}

impl Tail {
    /// Starts tailing `collection` after its newest document.
    ///
    /// # Errors
    ///
    /// Returns an error if the newest document cannot be read.
    pub fn new(connection: Arc<dyn Connection>, collection: &str) -> StoreResult<Self> {
        let last = connection.latest(collection)?.and_then(|doc| doc.id());
        debug!(collection, ?last, "tail started");
        Ok(Self {
            connection,
            collection: collection.to_string(),
            last,
            receiver: None,
            pending: VecDeque::new(),
            retry_delay: DEFAULT_RETRY_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Sets the delay between retries.
    #[must_use]
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Sets how often a waiting tail re-checks its connection.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Returns the collection being tailed.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn is_new(&self, doc: &Document) -> bool {
        match (self.last, doc.id()) {
            (Some(last), Some(id)) => id > last,
            _ => true,
        }
    }

    fn back_off(&mut self, error: &StoreError) {
        warn!(collection = %self.collection, %error, "tailing read failed, retrying");
        self.receiver = None;
        thread::sleep(self.retry_delay);
    }

    /// Subscribes and queues whatever was inserted since the last document.
    fn resume(&mut self) -> StoreResult<()> {
        let receiver = self.connection.subscribe(&self.collection)?;
        let filter = match self.last {
            Some(last) => Filter::all().after(last),
            None => Filter::all(),
        };
        let missed = self.connection.find(&self.collection, &filter)?;
        self.pending.extend(missed);
        self.receiver = Some(receiver);
        Ok(())
    }
}

impl Iterator for Tail {
    type Item = Document;

    fn next(&mut self) -> Option<Document> {
        loop {
            if let Some(doc) = self.pending.pop_front() {
                if !self.is_new(&doc) {
                    continue;
                }
                if let Some(id) = doc.id() {
                    self.last = Some(id);
                }
                return Some(doc);
            }

            match self.connection.state() {
                ConnectionState::Closed => {
                    debug!(collection = %self.collection, "tail ended");
                    return None;
                }
                ConnectionState::Disconnected => {
                    let error = StoreError::unavailable(
                        self.connection.database(),
                        "listen to new documents",
                    );
                    self.back_off(&error);
                    continue;
                }
                ConnectionState::Connected => {}
            }

            let Some(receiver) = &self.receiver else {
                if let Err(error) = self.resume() {
                    self.back_off(&error);
                }
                continue;
            };

            match receiver.recv_timeout(self.poll_interval) {
                Ok(doc) => self.pending.push_back(doc),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => self.receiver = None,
            }
        }
    }
}

impl std::fmt::Debug for Tail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tail")
            .field("collection", &self.collection)
            .field("last", &self.last)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{Address, Driver};
    use crate::memory::MemoryDriver;
    use serde_json::json;

    fn titled(title: &str) -> Document {
        Document::from_value(json!({ "title": title })).unwrap()
    }

    fn setup() -> (MemoryDriver, Arc<dyn Connection>) {
        let driver = MemoryDriver::new();
        let conn = driver
            .connect(&Address::new("localhost", 27017), "test")
            .unwrap();
        (driver, conn)
    }

    fn fast(tail: Tail) -> Tail {
        tail.retry_delay(Duration::from_millis(5))
            .poll_interval(Duration::from_millis(5))
    }

    #[test]
    fn skips_existing_documents() {
        let (_driver, conn) = setup();
        conn.insert("note", vec![titled("old")], true).unwrap();

        let mut tail = fast(Tail::new(Arc::clone(&conn), "note").unwrap());
        conn.insert("note", vec![titled("new")], true).unwrap();

        assert_eq!(tail.next().unwrap().get_str("title"), Some("new"));
    }

    #[test]
    fn yields_in_insert_order_across_threads() {
        let (_driver, conn) = setup();
        let mut tail = fast(Tail::new(Arc::clone(&conn), "note").unwrap());

        let writer = Arc::clone(&conn);
        let handle = thread::spawn(move || {
            for title in ["a", "b", "c"] {
                writer.insert("note", vec![titled(title)], true).unwrap();
                thread::sleep(Duration::from_millis(2));
            }
        });

        let titles: Vec<_> = (&mut tail)
            .take(3)
            .map(|d| d.get_str("title").unwrap().to_string())
            .collect();
        handle.join().unwrap();

        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn ends_when_connection_closes() {
        let (_driver, conn) = setup();
        let mut tail = fast(Tail::new(Arc::clone(&conn), "note").unwrap());

        conn.close().unwrap();

        assert!(tail.next().is_none());
    }

    #[test]
    fn survives_temporary_disconnect() {
        let (driver, conn) = setup();
        let mut tail = fast(Tail::new(Arc::clone(&conn), "note").unwrap());

        driver.set_online("test", false);
        let restorer = driver.clone();
        let writer = Arc::clone(&conn);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            restorer.set_online("test", true);
            writer.insert("note", vec![titled("back")], true).unwrap();
        });

        assert_eq!(tail.next().unwrap().get_str("title"), Some("back"));
        handle.join().unwrap();
    }

    #[test]
    fn other_collections_are_not_yielded() {
        let (_driver, conn) = setup();
        let mut tail = fast(Tail::new(Arc::clone(&conn), "note").unwrap());

        conn.insert("contact", vec![titled("elsewhere")], true).unwrap();
        conn.insert("note", vec![titled("here")], true).unwrap();

        assert_eq!(tail.next().unwrap().get_str("title"), Some("here"));
    }
}
