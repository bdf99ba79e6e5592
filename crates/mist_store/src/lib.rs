//! # Mist Store
//!
//! Document store adapter for Mist.
//!
//! This crate owns every database connection of the process and gives the
//! layers above a small, driver-neutral vocabulary: [`Document`]s made of
//! JSON fields, [`Filter`]s, [`Update`]s and [`ObjectId`]s.
//!
//! ## Design Principles
//!
//! - At most one live connection per database name
//! - Drivers are opaque: they evaluate filters and assign ids, nothing more
//! - A missing or disconnected connection is reported, never waited for
//! - Tailing reads are the only place where failures are retried
//!
//! ## Available Drivers
//!
//! - [`MemoryDriver`] - For tests and single-process deployments
//!
//! ## Example
//!
//! ```rust
//! use mist_store::{Document, Filter, Store};
//!
//! let store = Store::in_memory();
//! store.open("localhost", 27017, "mist", Some("mist")).unwrap();
//!
//! let conn = store.connection(None).unwrap();
//! let mut doc = Document::new();
//! doc.insert("title", "hello");
//! conn.insert("note", vec![doc], true).unwrap();
//!
//! let found = conn.find("note", &Filter::all().eq("title", "hello")).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change_feed;
mod config;
mod document;
mod driver;
mod error;
mod filter;
mod id;
mod memory;
mod store;
mod tail;

pub use change_feed::ChangeFeed;
pub use config::{Databases, StoreConfig};
pub use document::{Document, ID_FIELD, OWNER_FIELD};
pub use driver::{Address, Connection, ConnectionState, Driver};
pub use error::{StoreError, StoreResult};
pub use filter::{Condition, Filter, InsertOutcome, RowFailure, Update, UpdateOutcome};
pub use id::ObjectId;
pub use memory::{MemoryConnection, MemoryDriver};
pub use store::Store;
pub use tail::{Tail, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_DELAY};
