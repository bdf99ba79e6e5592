//! Token authentication.
//!
//! Tokens are compact JWTs signed with HMAC-SHA256:
//!
//! ```text
//! base64url(header) "." base64url(claims) "." base64url(signature)
//! ```
//!
//! The claims carry the user id as `iss` and the expiry as `exp`, in Unix
//! milliseconds. A token is rejected when its signature does not match or
//! its expiry has passed.
//!
//! Clients send the token either as `Authorization: Bearer <token>` or in
//! the `Api-Token` header.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use http::header::AUTHORIZATION;
use http::HeaderMap;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{ServerError, ServerResult};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying a bare token.
pub const API_TOKEN_HEADER: &str = "api-token";

/// Default token lifetime: 14 days.
pub const DEFAULT_TOKEN_EXPIRY: Duration = Duration::from_secs(14 * 24 * 60 * 60);

const ALGORITHM: &str = "HS256";

const HEADER: &str = r#"{"typ":"JWT","alg":"HS256"}"#;

#[derive(Deserialize)]
struct Header {
    alg: String,
}

/// Authentication configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for HMAC.
    pub secret: Vec<u8>,
    /// Token expiration duration.
    pub token_expiry: Duration,
}

impl AuthConfig {
    /// Creates a new auth configuration.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
            token_expiry: DEFAULT_TOKEN_EXPIRY,
        }
    }

    /// Sets the token expiration duration.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.token_expiry = expiry;
        self
    }
}

/// Claims carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Id of the user the token was issued to.
    pub iss: String,
    /// Expiry, Unix milliseconds.
    pub exp: i64,
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    /// Encoded token.
    pub token: String,
    /// Expiry, Unix milliseconds.
    pub expires: i64,
}

/// Issues and validates tokens.
#[derive(Clone)]
pub struct TokenValidator {
    config: AuthConfig,
}

impl TokenValidator {
    /// Creates a new token validator.
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issues a token for `user_id`, valid for the configured expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded.
    pub fn create_token(&self, user_id: &str) -> ServerResult<IssuedToken> {
        let expiry = i64::try_from(self.config.token_expiry.as_millis()).unwrap_or(i64::MAX);
        let claims = Claims {
            iss: user_id.to_string(),
            exp: Utc::now().timestamp_millis().saturating_add(expiry),
        };
        let token = self.encode(&claims)?;
        Ok(IssuedToken {
            token,
            expires: claims.exp,
        })
    }

    /// Signs arbitrary claims.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded.
    pub fn encode(&self, claims: &Claims) -> ServerResult<String> {
        let payload = serde_json::to_vec(claims).map_err(|e| ServerError::Internal(e.to_string()))?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = self.mac(signing_input.as_bytes())?.finalize().into_bytes();
        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Validates a token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::NotAuthorized`] if the token is malformed,
    /// tampered with or expired.
    pub fn validate_token(&self, token: &str) -> ServerResult<Claims> {
        let mut parts = token.trim().split('.');
        let (Some(header), Some(payload), Some(signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ServerError::NotAuthorized("malformed token".into()));
        };

        let signature = decode_part(signature)?;
        self.mac(format!("{header}.{payload}").as_bytes())?
            .verify_slice(&signature)
            .map_err(|_| ServerError::NotAuthorized("invalid signature".into()))?;

        let header: Header = serde_json::from_slice(&decode_part(header)?)
            .map_err(|_| ServerError::NotAuthorized("malformed token header".into()))?;
        if header.alg != ALGORITHM {
            return Err(ServerError::NotAuthorized(format!(
                "unsupported algorithm {}",
                header.alg
            )));
        }

        let claims: Claims = serde_json::from_slice(&decode_part(payload)?)
            .map_err(|_| ServerError::NotAuthorized("malformed token claims".into()))?;
        if Utc::now().timestamp_millis() > claims.exp {
            return Err(ServerError::NotAuthorized("token expired".into()));
        }
        Ok(claims)
    }

    /// Returns the token lifetime.
    pub fn token_expiry(&self) -> Duration {
        self.config.token_expiry
    }

    fn mac(&self, data: &[u8]) -> ServerResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.config.secret)
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        mac.update(data);
        Ok(mac)
    }
}

fn decode_part(part: &str) -> ServerResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(part)
        .map_err(|_| ServerError::NotAuthorized("malformed token".into()))
}

/// Extracts the token from request headers.
///
/// `Authorization: Bearer` wins over `Api-Token`.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    bearer
        .or_else(|| {
            headers
                .get(API_TOKEN_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
        })
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn validator() -> TokenValidator {
        TokenValidator::new(AuthConfig::new(b"test-secret-key-32-bytes-long!!".to_vec()))
    }

    #[test]
    fn create_and_validate_token() {
        let validator = validator();
        let issued = validator.create_token("5f1d7a3c9b1e4a0012345678").unwrap();
        assert_eq!(issued.token.split('.').count(), 3);

        let claims = validator.validate_token(&issued.token).unwrap();
        assert_eq!(claims.iss, "5f1d7a3c9b1e4a0012345678");
        assert_eq!(claims.exp, issued.expires);
    }

    #[test]
    fn expiry_defaults_to_fourteen_days() {
        let before = Utc::now().timestamp_millis();
        let issued = validator().create_token("user").unwrap();
        let lifetime = issued.expires - before;
        assert!(lifetime >= 14 * 24 * 60 * 60 * 1000);
        assert!(lifetime < 14 * 24 * 60 * 60 * 1000 + 60_000);
    }

    #[test]
    fn reject_tampered_token() {
        let validator = validator();
        let issued = validator.create_token("user").unwrap();

        let forged = validator
            .encode(&Claims {
                iss: "someone-else".into(),
                exp: issued.expires,
            })
            .unwrap();
        let (_, forged_signature) = forged.rsplit_once('.').unwrap();
        let (signing_input, _) = issued.token.rsplit_once('.').unwrap();
        let mixed = format!("{signing_input}.{forged_signature}");
        assert!(validator.validate_token(&mixed).is_err());

        let mut claims = issued.token.split('.').map(String::from).collect::<Vec<_>>();
        claims[1] = URL_SAFE_NO_PAD.encode(br#"{"iss":"admin","exp":9999999999999}"#);
        assert!(validator.validate_token(&claims.join(".")).is_err());
    }

    #[test]
    fn reject_other_secret() {
        let issued = validator().create_token("user").unwrap();
        let other = TokenValidator::new(AuthConfig::new("another secret"));
        assert!(other.validate_token(&issued.token).is_err());
    }

    #[test]
    fn reject_expired_token() {
        let validator = TokenValidator::new(
            AuthConfig::new(b"test-secret-key-32-bytes-long!!".to_vec())
                .with_expiry(Duration::from_secs(0)),
        );
        let issued = validator.create_token("user").unwrap();

        std::thread::sleep(Duration::from_millis(10));

        let err = validator.validate_token(&issued.token).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn reject_malformed_tokens() {
        let validator = validator();
        assert!(validator.validate_token("").is_err());
        assert!(validator.validate_token("a.b").is_err());
        assert!(validator.validate_token("a.b.c.d").is_err());
        assert!(validator.validate_token("!!.??.**").is_err());
    }

    #[test]
    fn header_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(token_from_headers(&headers), None);

        headers.insert(API_TOKEN_HEADER, HeaderValue::from_static("abc"));
        assert_eq!(token_from_headers(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(token_from_headers(&headers), Some("xyz"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert_eq!(token_from_headers(&headers), Some("abc"));
    }
}
