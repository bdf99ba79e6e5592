//! Server configuration.
//!
//! The configuration is a JSON file:
//!
//! ```json
//! {
//!   "server": { "host": "localhost", "port": 3000 },
//!   "database": { "host": "localhost", "port": 27017, "database": "mist" },
//!   "auth": { "secret": "change me", "tokenExpiryDays": 14 }
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use mist_store::StoreConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AuthConfig, DEFAULT_TOKEN_EXPIRY};
use crate::error::{ServerError, ServerResult};

/// Default file name searched by [`ServerConfig::load_first`] callers.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Where the HTTP listener binds. Binding itself is up to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Host name or address.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
        }
    }
}

/// Token settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSection {
    /// Secret used to sign tokens.
    pub secret: String,
    /// Token lifetime in days, 14 when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expiry_days: Option<u32>,
}

impl AuthSection {
    /// Returns the token lifetime.
    pub fn token_expiry(&self) -> Duration {
        self.token_expiry_days
            .map(|days| Duration::from_secs(u64::from(days) * SECONDS_PER_DAY))
            .unwrap_or(DEFAULT_TOKEN_EXPIRY)
    }
}

/// Configuration for the API server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listener address.
    #[serde(default)]
    pub server: HttpConfig,
    /// Database connection settings.
    pub database: StoreConfig,
    /// Token settings.
    pub auth: AuthSection,
}

impl ServerConfig {
    /// Creates a configuration for the given database settings.
    pub fn new(database: StoreConfig) -> Self {
        Self {
            database,
            ..Self::default()
        }
    }

    /// Sets the listener host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.server.host = host.into();
        self
    }

    /// Sets the listener port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Sets the database settings.
    pub fn with_database(mut self, database: StoreConfig) -> Self {
        self.database = database;
        self
    }

    /// Sets the token signing secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.auth.secret = secret.into();
        self
    }

    /// Sets the token lifetime in days.
    pub fn with_token_expiry_days(mut self, days: u32) -> Self {
        self.auth.token_expiry_days = Some(days);
        self
    }

    /// Returns the token configuration.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig::new(self.auth.secret.as_bytes()).with_expiry(self.auth.token_expiry())
    }

    /// Checks the settings the server owns. Database settings are checked
    /// when the store opens.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if the secret is empty or the port
    /// is 0.
    pub fn validate(&self) -> ServerResult<()> {
        if self.auth.secret.is_empty() {
            return Err(ServerError::Config("auth.secret must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(ServerError::Config("server.port must not be 0".into()));
        }
        Ok(())
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] naming the file if it cannot be read
    /// or parsed.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading config file");
        let contents = fs::read_to_string(path).map_err(|e| {
            ServerError::Config(format!("unable to read {}: {e}", path.display()))
        })?;
        let config = serde_json::from_str(&contents).map_err(|e| {
            ServerError::Config(format!(
                "unable to parse the configuration file {}: {e}",
                path.display()
            ))
        })?;
        info!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    /// Loads the first candidate file that exists.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] if none exists, or if the one found
    /// cannot be loaded.
    pub fn load_first<P: AsRef<Path>>(candidates: &[P]) -> ServerResult<(PathBuf, Self)> {
        let found = candidates
            .iter()
            .map(AsRef::as_ref)
            .find(|path| path.is_file())
            .ok_or_else(|| {
                let places = candidates
                    .iter()
                    .map(|path| path.as_ref().display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                ServerError::Config(format!(
                    "no config file found in the following places: {places}"
                ))
            })?;
        Ok((found.to_path_buf(), Self::load(found)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mist_store::Databases;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"{
        "server": {"host": "0.0.0.0", "port": 8080},
        "database": {"host": "db", "port": 27017, "database": ["mist", "archive"], "defaultDatabase": "mist"},
        "auth": {"secret": "s3cret", "tokenExpiryDays": 7}
    }"#;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new(StoreConfig::new().host("db").port(27017).database("mist"))
            .with_host("0.0.0.0")
            .with_port(9000)
            .with_secret("s3cret")
            .with_token_expiry_days(1);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.token_expiry(), Duration::from_secs(SECONDS_PER_DAY));
        assert_eq!(config.auth_config().secret, b"s3cret".to_vec());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.host, "localhost");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.auth.token_expiry(), DEFAULT_TOKEN_EXPIRY);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_parses_every_section() {
        let file = write_config(SAMPLE);
        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(
            config.database.database,
            Some(Databases::Many(vec!["mist".into(), "archive".into()]))
        );
        assert_eq!(config.database.effective_default(), Some("mist"));
        assert_eq!(config.auth.token_expiry_days, Some(7));
    }

    #[test]
    fn server_section_is_optional() {
        let file = write_config(r#"{"database": {"database": "mist"}, "auth": {"secret": "x"}}"#);
        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.server, HttpConfig::default());
    }

    #[test]
    fn load_errors_name_the_file() {
        let file = write_config("{ not json");
        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
        assert!(err.to_string().contains(&file.path().display().to_string()));

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let err = ServerConfig::load(&missing).unwrap_err();
        assert!(err.to_string().contains("missing.json"));
    }

    #[test]
    fn load_first_picks_first_existing() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.json");
        let present = dir.path().join(DEFAULT_CONFIG_FILE);
        fs::write(&present, SAMPLE).unwrap();

        let (path, config) = ServerConfig::load_first(&[&absent, &present]).unwrap();
        assert_eq!(path, present);
        assert_eq!(config.server.port, 8080);

        let err = ServerConfig::load_first(&[&absent]).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }
}
