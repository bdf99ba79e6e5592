//! # Mist Core
//!
//! Data access and data formats for Mist.
//!
//! This crate provides:
//! - [`Dao`], the ownership-scoped access object every handler goes through
//! - Contact, group and user models
//! - Google Contacts CSV normalization and group reconciliation
//! - JSON and XML import/export
//!
//! ## Example
//!
//! ```rust
//! use mist_core::Dao;
//! use mist_store::{Document, ObjectId, Store};
//!
//! let store = Store::in_memory();
//! store.open("localhost", 27017, "mist", Some("mist")).unwrap();
//!
//! let notes = Dao::new(store, "note");
//! let owner = ObjectId::new().to_hex();
//! let inserted = notes.insert(&owner, vec![Document::new()]).unwrap();
//! let id = inserted[0].id().unwrap().to_hex();
//!
//! assert!(notes.find_by_id(&owner, &id).unwrap().is_some());
//! assert!(notes.find_by_id(&ObjectId::new().to_hex(), &id).unwrap().is_none());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dao;
mod error;
pub mod export;
pub mod import;
pub mod model;
pub mod xml;

pub use dao::{Dao, UpdateResult};
pub use error::{CoreError, CoreResult};
pub use export::{export, Export, Representation};
pub use import::{import_contacts, import_notes, ImportFormat, NoteFormat};
