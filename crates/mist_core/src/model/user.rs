//! Users and credentials.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mist_store::{Document, Filter};
use serde::Deserialize;
use sha2::{Digest, Sha512};

/// Field holding the password digest.
pub const PASSWORD_FIELD: &str = "password";

/// Field holding the login name.
pub const LOGIN_FIELD: &str = "login";

/// Hashes a clear-text password the way it is stored: SHA-512, base64.
#[must_use]
pub fn hash_password(password: &str) -> String {
    STANDARD.encode(Sha512::digest(password.as_bytes()))
}

/// Removes the password digest from a user document before it leaves the
/// server.
#[must_use]
pub fn public_user(mut user: Document) -> Document {
    user.remove(PASSWORD_FIELD);
    user
}

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    /// Login name.
    pub login: String,
    /// Clear-text password.
    pub password: String,
}

impl Credentials {
    /// Returns the filter matching the user with these credentials.
    #[must_use]
    pub fn to_filter(&self) -> Filter {
        Filter::all()
            .eq(LOGIN_FIELD, self.login.as_str())
            .eq(PASSWORD_FIELD, hash_password(&self.password))
    }
}
