//! Change feed for observing inserted documents.
//!
//! Drivers emit every successfully inserted document here. Tailing reads
//! subscribe to one collection and receive the documents in insert order.
//!
//! # Usage
//!
//! ```rust
//! use mist_store::{ChangeFeed, Document};
//!
//! let feed = ChangeFeed::new();
//! let receiver = feed.subscribe("note");
//!
//! feed.emit("note", &Document::new());
//! assert!(receiver.try_recv().is_ok());
//! ```

use crate::document::Document;
use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};

/// A subscriber waiting for inserts into one collection.
struct Subscriber {
    collection: String,
    sender: Sender<Document>,
}

/// Distributes inserted documents to subscribers.
///
/// The change feed:
/// - Emits only documents that were actually written
/// - Preserves insert order per collection
/// - Drops subscribers whose receiver has gone away
/// - Disconnects every subscriber on [`ChangeFeed::close`]
#[derive(Default)]
pub struct ChangeFeed {
    subscribers: RwLock<Vec<Subscriber>>,
}

impl ChangeFeed {
    /// Creates a new change feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to inserts into `collection`.
    ///
    /// Returns a receiver that gets every document inserted after this call.
    pub fn subscribe(&self, collection: &str) -> Receiver<Document> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.write().push(Subscriber {
            collection: collection.to_string(),
            sender,
        });
        receiver
    }

    /// Emits an inserted document to the subscribers of its collection.
    pub fn emit(&self, collection: &str, document: &Document) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|s| {
            s.collection != collection || s.sender.send(document.clone()).is_ok()
        });
    }

    /// Disconnects every subscriber.
    pub fn close(&self) {
        self.subscribers.write().clear();
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::RecvTimeoutError;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn titled(title: &str) -> Document {
        let mut doc = Document::new();
        doc.insert("title", title);
        doc
    }

    #[test]
    fn emit_and_receive() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe("note");

        feed.emit("note", &titled("a"));

        let received = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received, titled("a"));
    }

    #[test]
    fn other_collections_are_ignored() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe("note");

        feed.emit("contact", &titled("a"));

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn subscriber_cleanup() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe("note");
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);
        feed.emit("note", &titled("a"));
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn close_disconnects() {
        let feed = ChangeFeed::new();
        let rx = feed.subscribe("note");

        feed.close();

        assert_eq!(
            rx.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Disconnected)
        );
    }

    #[test]
    fn threaded_subscribe() {
        let feed = Arc::new(ChangeFeed::new());
        let rx = feed.subscribe("note");

        let feed_clone = Arc::clone(&feed);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            feed_clone.emit("note", &titled("late"));
        });

        let received = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(received.get_str("title"), Some("late"));

        handle.join().unwrap();
    }
}
