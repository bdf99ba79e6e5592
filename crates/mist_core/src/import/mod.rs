//! Import of external formats.
//!
//! Contacts come from a Google Contacts CSV export or from a Mist JSON
//! export; notes from a JSON array or an XML archive. A payload that fails
//! to parse is rejected as a whole, nothing gets written.

mod google;
mod groups;

pub use google::{parse_google_csv, DELIMITER};
pub use groups::{existing_groups, reconcile, GroupReconciler};

use mist_store::Document;
use serde_json::Value;
use tracing::info;

use crate::dao::Dao;
use crate::error::{CoreError, CoreResult};
use crate::model::ContactEntry;
use crate::xml;

/// Media type of Google Contacts CSV exports.
pub const GOOGLE_CSV_CONTENT_TYPE: &str = "text/csv-google";

/// Media type of Mist JSON exports.
pub const MIST_JSON_CONTENT_TYPE: &str = "application/json-mist";

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Format of a contact import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// Google Contacts CSV export.
    GoogleCsv,
    /// JSON array of contacts and groups, as exported by Mist.
    MistJson,
}

impl ImportFormat {
    /// Picks the format from a `Content-Type` header value.
    ///
    /// Returns `None` for an unsupported type.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match media_type(content_type).as_str() {
            GOOGLE_CSV_CONTENT_TYPE => Some(ImportFormat::GoogleCsv),
            MIST_JSON_CONTENT_TYPE | "application/json" => Some(ImportFormat::MistJson),
            _ => None,
        }
    }
}

/// Format of a note import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteFormat {
    /// JSON array of notes.
    Json,
    /// `<notes><note>...</note></notes>` archive.
    Xml,
}

impl NoteFormat {
    /// Picks the format from a `Content-Type` header value.
    ///
    /// Returns `None` for an unsupported type.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match media_type(content_type).as_str() {
            "application/json" => Some(NoteFormat::Json),
            "application/xml" | "text/xml" => Some(NoteFormat::Xml),
            _ => None,
        }
    }
}

fn utf8<'a>(format: &'static str, body: &'a [u8]) -> CoreResult<&'a str> {
    std::str::from_utf8(body).map_err(|e| CoreError::parse(format, e.to_string()))
}

/// Parses a contact import payload.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] if the payload is malformed.
pub fn parse_contacts(format: ImportFormat, body: &[u8]) -> CoreResult<Vec<ContactEntry>> {
    match format {
        ImportFormat::GoogleCsv => Ok(parse_google_csv(utf8("Google CSV", body)?)?
            .into_iter()
            .map(ContactEntry::Contact)
            .collect()),
        ImportFormat::MistJson => serde_json::from_slice(body)
            .map_err(|e| CoreError::parse("Mist JSON", e.to_string())),
    }
}

/// Parses a note import payload.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] if the payload is malformed or is not a
/// list of objects.
pub fn parse_notes(format: NoteFormat, body: &[u8]) -> CoreResult<Vec<Document>> {
    let (name, value) = match format {
        NoteFormat::Json => (
            "JSON notes",
            serde_json::from_slice::<Value>(body)
                .map_err(|e| CoreError::parse("JSON notes", e.to_string()))?,
        ),
        NoteFormat::Xml => ("XML notes", xml::from_xml(utf8("XML notes", body)?)?.1),
    };

    let items = match value {
        Value::Array(items) => items,
        // An XML archive without notes: `<notes></notes>` or `<notes/>`.
        Value::String(text) if matches!(format, NoteFormat::Xml) && text.is_empty() => Vec::new(),
        _ => return Err(CoreError::parse(name, "expected a list of notes")),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(Document::from_map(fields)),
            // An empty XML element such as `<note/>`.
            Value::String(text) if text.is_empty() => Ok(Document::new()),
            _ => Err(CoreError::parse(name, format!("note {index} is not an object"))),
        })
        .collect()
}

/// Imports contacts for `owner`.
///
/// The payload is parsed, reconciled against the owner's groups and
/// inserted. Returns the written documents.
///
/// # Errors
///
/// Returns an error if the payload is malformed or the store fails.
pub fn import_contacts(
    dao: &Dao,
    owner: &str,
    format: ImportFormat,
    body: &[u8],
) -> CoreResult<Vec<Document>> {
    let mut batch = parse_contacts(format, body)?;
    reconcile(dao, owner, &mut batch)?;
    let documents = batch
        .iter()
        .map(ContactEntry::to_document)
        .collect::<CoreResult<Vec<_>>>()?;
    let inserted = dao.insert(owner, documents)?;
    info!(?format, count = inserted.len(), "contacts imported");
    Ok(inserted)
}

/// Imports notes for `owner`, returning the written documents.
///
/// # Errors
///
/// Returns an error if the payload is malformed or the store fails.
pub fn import_notes(
    dao: &Dao,
    owner: &str,
    format: NoteFormat,
    body: &[u8],
) -> CoreResult<Vec<Document>> {
    let notes = parse_notes(format, body)?;
    let inserted = dao.insert(owner, notes)?;
    info!(?format, count = inserted.len(), "notes imported");
    Ok(inserted)
}
