//! Token command implementation.

use mist_server::{ServerConfig, TokenValidator};
use mist_store::ObjectId;
use serde_json::json;
use std::path::Path;

/// Runs the token command.
pub fn run(config_path: &Path, user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load(config_path)?;
    println!("{}", issue(&config, user)?);
    Ok(())
}

/// Issues a token for `user` signed with the configured secret.
pub fn issue(config: &ServerConfig, user: &str) -> Result<String, Box<dyn std::error::Error>> {
    config.validate()?;
    let user = ObjectId::parse(user)?;
    let issued = TokenValidator::new(config.auth_config()).create_token(&user.to_hex())?;
    Ok(json!({ "token": issued.token, "expires": issued.expires }).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mist_store::StoreConfig;

    fn config() -> ServerConfig {
        ServerConfig::new(StoreConfig::new().database("mist")).with_secret("s3cret")
    }

    #[test]
    fn issued_token_validates() {
        let user = ObjectId::new().to_hex();
        let output: serde_json::Value = serde_json::from_str(&issue(&config(), &user).unwrap()).unwrap();

        let validator = TokenValidator::new(config().auth_config());
        let claims = validator
            .validate_token(output["token"].as_str().unwrap())
            .unwrap();
        assert_eq!(claims.iss, user);
        assert_eq!(output["expires"].as_i64(), Some(claims.exp));
    }

    #[test]
    fn rejects_bad_user_and_missing_secret() {
        assert!(issue(&config(), "nope").is_err());
        let no_secret = ServerConfig::new(StoreConfig::new().database("mist"));
        assert!(issue(&no_secret, &ObjectId::new().to_hex()).is_err());
    }
}
