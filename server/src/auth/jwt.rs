//! JWT signing module.
//!
//! Produces HS256-signed JSON Web Tokens carrying the application token
//! claims. Downstream applications verify them with their own copy of the
//! application's secret.
//!
//! # Pre-conditions
//! - The secret must be non-empty.
//!
//! # Post-conditions
//! - On success, returns a compact `header.payload.signature` token.
//!
//! # Invariants
//! - Signing is stateless and does not modify any external state.
//! - Key material never appears in errors.

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use super::app_config::SigningSecret;
use super::authorization::PrivilegeLevel;

/// Claims embedded in an application token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// The authenticated user's email.
    pub email: String,
    /// Privilege level for the application the token was issued for.
    pub level: PrivilegeLevel,
    /// Avatar URL for client display.
    #[serde(rename = "image-url")]
    pub image_url: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: u64,
    /// Expiration, seconds since the Unix epoch.
    pub exp: u64,
}

/// Error returned when a token can't be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningError {
    /// The HS256 secret is empty.
    EmptySecret,
    /// The encoder rejected the claims.
    Encoding(String),
}

impl std::fmt::Display for SigningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptySecret => write!(f, "HS256 secret must not be empty"),
            Self::Encoding(reason) => write!(f, "failed to encode JWT: {reason}"),
        }
    }
}

impl std::error::Error for SigningError {}

/// Signs `claims` with HS256 under `secret`.
///
/// # Errors
/// Returns `SigningError::EmptySecret` for an empty secret and
/// `SigningError::Encoding` if serialization or signing fails.
pub fn sign_hs256(claims: &TokenClaims, secret: &SigningSecret) -> Result<String, SigningError> {
    if secret.is_empty() {
        return Err(SigningError::EmptySecret);
    }

    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&header, claims, &key).map_err(|e| SigningError::Encoding(e.to_string()))
}

/// Decodes and verifies a token the way a downstream application would.
#[cfg(test)]
pub fn decode_hs256(
    token: &str,
    secret: &[u8],
) -> Result<TokenClaims, jsonwebtoken::errors::Error> {
    use jsonwebtoken::{DecodingKey, Validation, decode};

    let validation = Validation::new(Algorithm::HS256);
    decode::<TokenClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map(|data| data.claims)
}
