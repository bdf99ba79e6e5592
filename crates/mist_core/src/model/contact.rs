//! Contacts and groups.
//!
//! Both live in the `contact` collection. A group is told apart from a
//! contact by its `name` field.

use chrono::Utc;
use mist_store::Document;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};

/// Icon given to groups created during an import.
pub const DEFAULT_GROUP_ICON: &str = "group";

/// Kind of phone number.
///
/// An unknown or missing label reads as [`PhoneType::Home`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhoneType {
    /// Mobile phone.
    Cell,
    /// Fax machine.
    Fax,
    /// Pager.
    Pager,
    /// Home or office line.
    #[default]
    #[serde(other)]
    Home,
}

/// Kind of e-mail address.
///
/// An unknown or missing label reads as [`MailType::Personal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailType {
    /// Work address.
    Professional,
    /// Private address.
    #[default]
    #[serde(other)]
    Personal,
}

/// Kind of postal address.
///
/// An unknown or missing label reads as [`AddressType::Home`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressType {
    /// Work address.
    Work,
    /// Home address.
    #[default]
    #[serde(other)]
    Home,
}

/// A phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phone {
    /// Kind of number.
    #[serde(default, rename = "type")]
    pub kind: PhoneType,
    /// The number as written.
    pub number: String,
}

/// An e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mail {
    /// Kind of address.
    #[serde(default, rename = "type")]
    pub kind: MailType,
    /// The address.
    pub address: String,
}

/// A postal address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Kind of address.
    #[serde(default, rename = "type")]
    pub kind: AddressType,
    /// Street name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    /// House number, split off the street.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    /// Post office box.
    #[serde(default, rename = "box", skip_serializing_if = "Option::is_none")]
    pub po_box: Option<String>,
    /// Postal code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    /// City.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    /// Region or state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Country.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    /// Creates an address with no fields set.
    #[must_use]
    pub fn new(kind: AddressType) -> Self {
        Self {
            kind,
            street: None,
            number: None,
            po_box: None,
            postal_code: None,
            locality: None,
            region: None,
            country: None,
        }
    }
}

/// A contact.
///
/// Fields the model does not know about are kept in `extra` so that a
/// document survives an export/import cycle unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Given name, with any additional name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Nickname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// Company or organization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<String>,
    /// Job title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Milliseconds since the Unix epoch, UTC midnight.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birthday: Option<i64>,
    /// Website.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Phone numbers, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phones: Vec<Phone>,
    /// E-mail addresses, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mails: Vec<Mail>,
    /// Postal addresses, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<Address>,
    /// Group names, each once, in order of first appearance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    /// Any other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Contact {
    /// Creates an empty contact.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group name unless the contact already has it.
    pub fn add_group(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.groups.contains(&name) {
            self.groups.push(name);
        }
    }
}

/// A group of contacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    /// Group name, unique per owner.
    pub name: String,
    /// Icon shown next to the group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<i64>,
    /// Any other field.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Group {
    /// Creates a group stamped with the current time and the default icon.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            icon: Some(DEFAULT_GROUP_ICON.to_string()),
            creation_date: Some(Utc::now().timestamp_millis()),
            extra: Map::new(),
        }
    }
}

/// An element of the `contact` collection: either a group or a contact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContactEntry {
    /// A group marker document.
    Group(Group),
    /// A contact.
    Contact(Contact),
}

impl ContactEntry {
    /// Returns the group name if this entry is a group.
    #[must_use]
    pub fn group_name(&self) -> Option<&str> {
        match self {
            ContactEntry::Group(group) => Some(&group.name),
            ContactEntry::Contact(_) => None,
        }
    }

    /// Converts the entry into a storable document.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry does not serialize to a JSON object.
    pub fn to_document(&self) -> CoreResult<Document> {
        let value = serde_json::to_value(self)?;
        Document::from_value(value)
            .ok_or_else(|| CoreError::invalid_document("contact entry is not an object"))
    }

    /// Reads an entry back from a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not have the shape of a
    /// contact or a group.
    pub fn from_document(document: Document) -> CoreResult<Self> {
        Ok(serde_json::from_value(document.into_value())?)
    }
}

impl From<Contact> for ContactEntry {
    fn from(contact: Contact) -> Self {
        ContactEntry::Contact(contact)
    }
}

impl From<Group> for ContactEntry {
    fn from(group: Group) -> Self {
        ContactEntry::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn contact_serializes_camel_case_and_skips_empty() {
        let mut contact = Contact::new();
        contact.first_name = Some("Ada".into());
        contact.phones.push(Phone {
            kind: PhoneType::Cell,
            number: "555".into(),
        });
        let mut address = Address::new(AddressType::Work);
        address.po_box = Some("B2".into());
        address.postal_code = Some("1000".into());
        contact.addresses.push(address);

        let value = serde_json::to_value(&contact).unwrap();
        assert_eq!(
            value,
            json!({
                "firstName": "Ada",
                "phones": [{"type": "cell", "number": "555"}],
                "addresses": [{"type": "work", "box": "B2", "postalCode": "1000"}]
            })
        );
    }

    #[test]
    fn entries_are_told_apart_by_name() {
        let group: ContactEntry =
            serde_json::from_value(json!({"name": "Family", "icon": "group"})).unwrap();
        assert_eq!(group.group_name(), Some("Family"));

        let contact: ContactEntry =
            serde_json::from_value(json!({"firstName": "Ada", "groups": ["Family"]})).unwrap();
        assert!(matches!(contact, ContactEntry::Contact(ref c) if c.groups == ["Family"]));
    }

    #[test]
    fn unknown_fields_survive() {
        let entry: ContactEntry =
            serde_json::from_value(json!({"firstName": "Ada", "favorite": true})).unwrap();
        let doc = entry.to_document().unwrap();
        assert_eq!(doc.get("favorite"), Some(&json!(true)));
    }

    #[test]
    fn unknown_type_labels_fall_back() {
        let entry: ContactEntry = serde_json::from_value(json!({
            "firstName": "Ada",
            "phones": [{"type": "work", "number": "1"}, {"number": "2"}, {"type": "fax", "number": "3"}],
            "mails": [{"type": "Work", "address": "ada@example.org"}],
            "addresses": [{"type": "office", "street": "Main"}]
        }))
        .unwrap();
        let ContactEntry::Contact(contact) = entry else {
            panic!("expected a contact");
        };
        let phones: Vec<_> = contact.phones.iter().map(|p| p.kind).collect();
        assert_eq!(phones, vec![PhoneType::Home, PhoneType::Home, PhoneType::Fax]);
        assert_eq!(contact.mails[0].kind, MailType::Personal);
        assert_eq!(contact.addresses[0].kind, AddressType::Home);
    }

    #[test]
    fn group_fields_survive() {
        let entry: ContactEntry =
            serde_json::from_value(json!({"name": "Family", "icon": "heart", "color": "red"}))
                .unwrap();
        let doc = entry.to_document().unwrap();
        assert_eq!(doc.get("color"), Some(&json!("red")));
        assert_eq!(doc.get_str("icon"), Some("heart"));
    }

    #[test]
    fn add_group_keeps_first_occurrence() {
        let mut contact = Contact::new();
        contact.add_group("Work");
        contact.add_group("Family");
        contact.add_group("Work");
        assert_eq!(contact.groups, vec!["Work", "Family"]);
    }

    #[test]
    fn new_group_defaults() {
        let group = Group::new("Friends");
        assert_eq!(group.icon.as_deref(), Some(DEFAULT_GROUP_ICON));
        assert!(group.creation_date.unwrap() > 0);
    }
}
