//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use mist_core::model::Contact;
use mist_store::{Document, ObjectId};
use proptest::prelude::*;
use serde_json::Value;

/// Strategy for generating object ids.
pub fn object_id_strategy() -> impl Strategy<Value = ObjectId> {
    prop::array::uniform12(any::<u8>()).prop_map(ObjectId::from_bytes)
}

/// Strategy for generating owner ids as sent by clients.
pub fn owner_strategy() -> impl Strategy<Value = String> {
    object_id_strategy().prop_map(|id| id.to_hex())
}

/// Strategy for generating client field names.
///
/// Never starts with `_` (reserved) or `$` (rejected by the store).
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-zA-Z0-9]{0,11}").expect("Invalid regex")
}

/// Strategy for generating scalar field values.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[ -~]{0,24}".prop_map(Value::from),
    ]
}

/// Strategy for generating notes: 1 to 6 client fields, no reserved ones.
pub fn note_strategy() -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name_strategy(), scalar_strategy(), 1..6)
        .prop_map(|fields| fields.into_iter().collect())
}

/// Strategy for generating contacts with names and group memberships.
pub fn contact_strategy() -> impl Strategy<Value = Contact> {
    (
        prop::option::of("[A-Z][a-z]{1,8}"),
        prop::option::of("[A-Z][a-z]{1,10}"),
        prop::collection::vec("[A-Z][a-z]{2,8}", 0..4),
    )
        .prop_map(|(first_name, last_name, groups)| {
            let mut contact = Contact::new();
            contact.first_name = first_name;
            contact.last_name = last_name;
            for group in groups {
                contact.add_group(group);
            }
            contact
        })
}
