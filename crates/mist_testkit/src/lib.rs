//! # Mist Testkit
//!
//! Test utilities for Mist.
//!
//! This crate provides:
//! - An opened in-memory store fixture with owner helpers
//! - Property-based test generators using proptest
//! - Sample import payloads (Google CSV, note archives)
//!
//! ## Usage
//!
//! ```rust
//! use mist_testkit::prelude::*;
//!
//! let store = TestStore::memory();
//! let notes = store.dao("note");
//! let owner = TestStore::owner();
//! assert!(notes.find_all(&owner).unwrap().is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod samples;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::samples::*;
}

pub use fixtures::*;
pub use generators::*;
pub use samples::*;
