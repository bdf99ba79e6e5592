//! Export of stored documents.
//!
//! Exports never carry internal fields: every field whose name starts with
//! `_` is removed, at any depth. The representation is negotiated from an
//! HTTP `Accept` header.

use mist_store::Document;
use serde_json::Value;

use crate::error::CoreResult;
use crate::xml;

/// Prefix marking internal fields.
pub const INTERNAL_PREFIX: char = '_';

/// Media type of JSON exports.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Media type of XML exports.
pub const XML_CONTENT_TYPE: &str = "application/xml";

/// Wire representation of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    /// JSON array.
    Json,
    /// XML document.
    Xml,
}

impl Representation {
    /// Picks a representation from an `Accept` header value.
    ///
    /// JSON is used when the header is missing or accepts any type or
    /// `application/json`; XML only when `application/xml` or `text/xml`
    /// is named. Media ranges are tried in the order they are listed.
    /// Returns `None` when nothing acceptable is offered.
    #[must_use]
    pub fn negotiate(accept: Option<&str>) -> Option<Self> {
        let Some(accept) = accept.map(str::trim).filter(|a| !a.is_empty()) else {
            return Some(Representation::Json);
        };
        accept.split(',').find_map(|range| {
            let media = range.split(';').next().unwrap_or_default().trim();
            match media.to_ascii_lowercase().as_str() {
                "*/*" | "application/*" | "application/json" => Some(Representation::Json),
                "application/xml" | "text/xml" => Some(Representation::Xml),
                _ => None,
            }
        })
    }

    /// Returns the media type of the representation.
    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Representation::Json => JSON_CONTENT_TYPE,
            Representation::Xml => XML_CONTENT_TYPE,
        }
    }
}

/// An encoded export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    /// Media type of `body`.
    pub content_type: &'static str,
    /// Encoded documents.
    pub body: String,
}

/// Removes every field whose name starts with `_`, recursively.
pub fn strip_internal(value: &mut Value) {
    match value {
        Value::Object(fields) => {
            fields.retain(|name, _| !name.starts_with(INTERNAL_PREFIX));
            fields.values_mut().for_each(strip_internal);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_internal),
        _ => {}
    }
}

/// Encodes documents for export.
///
/// `root` names the XML root element; its singular names each document.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn export(documents: Vec<Document>, root: &str, representation: Representation) -> CoreResult<Export> {
    let mut value = Value::Array(documents.into_iter().map(Document::into_value).collect());
    strip_internal(&mut value);
    let body = match representation {
        Representation::Json => serde_json::to_string(&value)?,
        Representation::Xml => xml::to_xml(root, &value),
    };
    Ok(Export {
        content_type: representation.content_type(),
        body,
    })
}
