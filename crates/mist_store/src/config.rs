//! Store configuration.

use crate::error::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// One database name or a list of names to open together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Databases {
    /// A single database.
    One(String),
    /// Several databases opened concurrently.
    Many(Vec<String>),
}

impl Databases {
    /// Returns the names as a slice-like list.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Databases::One(name) => vec![name.as_str()],
            Databases::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Checks that there is at least one name and no name is empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] describing the first problem found.
    pub fn validate(&self) -> StoreResult<()> {
        let names = self.names();
        if names.is_empty() {
            return Err(StoreError::config("database list is empty"));
        }
        if names.iter().any(|name| name.is_empty()) {
            return Err(StoreError::config("database name is empty"));
        }
        Ok(())
    }
}

impl From<&str> for Databases {
    fn from(name: &str) -> Self {
        Databases::One(name.to_string())
    }
}

impl From<String> for Databases {
    fn from(name: String) -> Self {
        Databases::One(name)
    }
}

impl From<Vec<String>> for Databases {
    fn from(names: Vec<String>) -> Self {
        Databases::Many(names)
    }
}

impl From<&[&str]> for Databases {
    fn from(names: &[&str]) -> Self {
        Databases::Many(names.iter().map(ToString::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Databases {
    fn from(names: [&str; N]) -> Self {
        Databases::Many(names.iter().map(ToString::to_string).collect())
    }
}

/// Connection settings for [`crate::Store::open_with`].
///
/// Every field is optional at deserialization time so that a missing
/// value is reported as a configuration error by the store rather than a
/// parse error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Database server host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Database server port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Database or databases to open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<Databases>,

    /// Database used when a caller names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_database: Option<String>,
}

impl StoreConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the database or databases to open.
    #[must_use]
    pub fn database(mut self, database: impl Into<Databases>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Sets the default database.
    #[must_use]
    pub fn default_database(mut self, name: impl Into<String>) -> Self {
        self.default_database = Some(name.into());
        self
    }

    /// Returns the default database, falling back to the opened database
    /// when exactly one is configured.
    #[must_use]
    pub fn effective_default(&self) -> Option<&str> {
        self.default_database.as_deref().or(match &self.database {
            Some(Databases::One(name)) => Some(name.as_str()),
            _ => None,
        })
    }
}
