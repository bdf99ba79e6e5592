//! CLI command implementations.

pub mod check_config;
pub mod convert_notes;
pub mod parse_contacts;
pub mod token;
