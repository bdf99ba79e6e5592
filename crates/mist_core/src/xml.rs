//! XML representation of JSON documents.
//!
//! Encoding rules:
//!
//! - an object emits one child element per field
//! - an array emits each item under the singular of its own element name
//!   (the name minus its last character: `notes` holds `note`s)
//! - every other value is a leaf wrapped in CDATA; `null` is empty
//! - a field whose name is not a valid element name is left out, as is an
//!   array whose item name would be empty
//!
//! Decoding reverses them. An element whose children all carry the
//! singular of its name becomes an array; leaves come back as strings and
//! an empty element reads as the empty string.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{CoreError, CoreResult};

const FORMAT: &str = "XML";

/// Declaration written before the root element.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Returns the element name used for items of the container `name`.
#[must_use]
pub fn singular(name: &str) -> &str {
    let mut chars = name.chars();
    chars.next_back();
    chars.as_str()
}

/// Returns true if `name` can be used as an element name.
///
/// Accepts a letter or `_` followed by letters, digits, `-`, `_` or `.`.
/// Namespace prefixes (`:`) are not accepted.
#[must_use]
pub fn is_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
        }
        _ => false,
    }
}

fn is_writable(name: &str, value: &Value) -> bool {
    is_element_name(name) && (!value.is_array() || is_element_name(singular(name)))
}

/// Encodes `value` as an XML document whose root element is `root`.
#[must_use]
pub fn to_xml(root: &str, value: &Value) -> String {
    let mut out = String::from(XML_DECLARATION);
    write_element(&mut out, root, value);
    out
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    out.push('<');
    out.push_str(name);
    out.push('>');
    match value {
        Value::Array(items) => {
            let item_name = singular(name);
            for item in items {
                write_element(out, item_name, item);
            }
        }
        Value::Object(fields) => {
            for (field, item) in fields {
                if is_writable(field, item) {
                    write_element(out, field, item);
                } else {
                    warn!(field = %field, "field cannot be written as XML, skipped");
                }
            }
        }
        Value::Null => out.push_str("<![CDATA[]]>"),
        Value::String(text) => write_cdata(out, text),
        leaf => write_cdata(out, &leaf.to_string()),
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn write_cdata(out: &mut String, text: &str) {
    out.push_str("<![CDATA[");
    // A CDATA section cannot contain its own terminator; split it.
    out.push_str(&text.replace("]]>", "]]]]><![CDATA[>"));
    out.push_str("]]>");
}

#[derive(Debug)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn into_value(self) -> Value {
        if self.children.is_empty() {
            return Value::String(self.text);
        }
        let item_name = singular(&self.name);
        if self.children.iter().all(|child| child.name == item_name) {
            return Value::Array(self.children.into_iter().map(Node::into_value).collect());
        }

        let mut fields = Map::new();
        for child in self.children {
            let name = child.name.clone();
            let value = child.into_value();
            match fields.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    fields.insert(name, value);
                }
            }
        }
        Value::Object(fields)
    }
}

fn element_name(name: &[u8]) -> CoreResult<String> {
    std::str::from_utf8(name)
        .map(ToString::to_string)
        .map_err(|e| CoreError::parse(FORMAT, e.to_string()))
}

/// Decodes an XML document, returning its root element name and content.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] if the document is not well-formed or has
/// no root element.
pub fn from_xml(xml: &str) -> CoreResult<(String, Value)> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            CoreError::parse(
                FORMAT,
                format!("{e} at position {}", reader.error_position()),
            )
        })?;
        match event {
            Event::Start(start) => {
                stack.push(Node::new(element_name(start.name().as_ref())?));
            }
            Event::Empty(empty) => {
                let node = Node::new(element_name(empty.name().as_ref())?);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| CoreError::parse(FORMAT, "unexpected closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| CoreError::parse(FORMAT, e.to_string()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = std::str::from_utf8(&data)
                    .map_err(|e| CoreError::parse(FORMAT, e.to_string()))?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CoreError::parse(FORMAT, "unclosed element at end of input"));
    }
    let root = root.ok_or_else(|| CoreError::parse(FORMAT, "no root element"))?;
    Ok((root.name.clone(), root.into_value()))
}
