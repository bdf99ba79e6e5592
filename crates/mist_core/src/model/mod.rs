//! Document models.
//!
//! Notes have no schema beyond the reserved fields and are handled as
//! plain [`mist_store::Document`]s.

mod contact;
mod user;

pub use contact::{
    Address, AddressType, Contact, ContactEntry, Group, Mail, MailType, Phone, PhoneType,
    DEFAULT_GROUP_ICON,
};
pub use user::{hash_password, public_user, Credentials, LOGIN_FIELD, PASSWORD_FIELD};

/// Collection holding contacts and groups.
pub const CONTACT_COLLECTION: &str = "contact";

/// Collection holding notes.
pub const NOTE_COLLECTION: &str = "note";

/// Collection holding users.
pub const USER_COLLECTION: &str = "user";

/// Group every owner has without storing it.
pub const STARRED_GROUP: &str = "Starred";
