//! Per-application signing and authorization configuration.
//!
//! # Pre-conditions
//! - `name` must be a non-empty string.
//! - The signing secret must contain at least one byte.
//!
//! # Post-conditions
//! - `ApplicationEntry` instances are immutable once created.
//!
//! # Invariants
//! - Every entry owns its own secret; no key material is shared between entries.
//! - Secret bytes never appear in `Debug` output.

use std::path::{Path, PathBuf};

/// Error returned when an application entry is invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppConfigError {
    /// The application name is empty.
    EmptyName,
    /// The HS256 secret is empty.
    EmptySecret {
        /// Application that was configured without a secret.
        name: String,
    },
}

impl std::fmt::Display for AppConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "application name must not be empty"),
            Self::EmptySecret { name } => {
                write!(f, "signing secret for application '{name}' must not be empty")
            }
        }
    }
}

impl std::error::Error for AppConfigError {}

/// Symmetric HS256 key material for one application.
///
/// The bytes are only reachable through [`SigningSecret::as_bytes`], which the
/// token signer uses. `Debug` is redacted so the secret can't leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(Vec<u8>);

impl SigningSecret {
    /// Wrap raw key material.
    ///
    /// Emptiness is checked by [`ApplicationEntry::new`] and again at signing time.
    #[must_use]
    pub const fn new(secret: Vec<u8>) -> Self {
        Self(secret)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningSecret(<redacted>)")
    }
}

/// A registered application.
///
/// Each application has its own signing secret and optionally a JSON file
/// mapping user emails to privilege levels.
#[derive(Debug, Clone)]
pub struct ApplicationEntry {
    name: String,
    signing_secret: SigningSecret,
    auth_source: Option<PathBuf>,
}

impl ApplicationEntry {
    /// Create a new application entry.
    ///
    /// # Pre-conditions
    /// - `name` must not be empty.
    /// - `signing_secret` must not be empty.
    ///
    /// # Errors
    /// Returns `AppConfigError::EmptyName` or `AppConfigError::EmptySecret`.
    pub fn new(
        name: impl Into<String>,
        signing_secret: Vec<u8>,
        auth_source: Option<PathBuf>,
    ) -> Result<Self, AppConfigError> {
        let name = name.into();
        if name.is_empty() {
            return Err(AppConfigError::EmptyName);
        }
        if signing_secret.is_empty() {
            return Err(AppConfigError::EmptySecret { name });
        }
        Ok(Self {
            name,
            signing_secret: SigningSecret::new(signing_secret),
            auth_source,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn signing_secret(&self) -> &SigningSecret {
        &self.signing_secret
    }

    /// Path of the authorization file, if the application has one.
    #[must_use]
    pub fn auth_source(&self) -> Option<&Path> {
        self.auth_source.as_deref()
    }
}
