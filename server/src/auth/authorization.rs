//! Per-application privilege resolution.
//!
//! An application may name a JSON authorization file mapping user emails to
//! an arbitrary privilege value:
//!
//! ```json
//! { "alice@x.org": "admin", "bob@x.org": { "datasets": ["hemibrain"] } }
//! ```
//!
//! The value is never interpreted here. It is copied into the token as-is and
//! the downstream application decides what it means.
//!
//! # Post-conditions
//! - Users without an entry, and every user of an application without an
//!   authorization file, resolve to [`PrivilegeLevel::NoAuth`].
//!
//! # Invariants
//! - The file is read again on every resolution, so edits take effect on the
//!   next request. There is no cache.
//! - A resolution never waits longer than the configured timeout. The read
//!   itself runs on tokio's blocking pool and is not cancelled when the
//!   timeout fires; a read stuck in the kernel (a stalled network mount, a
//!   FIFO with no writer) keeps its blocking thread, and runtime shutdown
//!   waits for that thread to finish.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::app_config::ApplicationEntry;
use super::identity::Identity;

/// Privilege level assigned to a user for one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegeLevel {
    /// No authorization record; serialized as the string `"noauth"`.
    NoAuth,
    /// The value found in the authorization file.
    Granted(Value),
}

impl PrivilegeLevel {
    /// Wire value of [`PrivilegeLevel::NoAuth`].
    pub const NOAUTH: &'static str = "noauth";
}

impl Serialize for PrivilegeLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::NoAuth => serializer.serialize_str(Self::NOAUTH),
            Self::Granted(value) => value.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for PrivilegeLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(ref s) if s == Self::NOAUTH => Self::NoAuth,
            other => Self::Granted(other),
        })
    }
}

/// Error returned when an authorization file can't be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The file could not be opened or read, or the read timed out.
    Unreadable { path: PathBuf, reason: String },
    /// The file is not a JSON object keyed by email.
    Malformed { path: PathBuf, reason: String },
}

impl std::fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { path, reason } => {
                write!(f, "cannot read authorization file {}: {reason}", path.display())
            }
            Self::Malformed { path, reason } => {
                write!(f, "malformed authorization file {}: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for AuthorizationError {}

/// Looks up privilege levels in application authorization files.
#[derive(Debug, Clone)]
pub struct AuthorizationResolver {
    read_timeout: Duration,
}

impl AuthorizationResolver {
    #[must_use]
    pub const fn new(read_timeout: Duration) -> Self {
        Self { read_timeout }
    }

    /// Resolve the privilege level of `identity` for `entry`.
    ///
    /// # Errors
    /// Returns `AuthorizationError::Unreadable` if the file can't be read in
    /// time and `AuthorizationError::Malformed` if it doesn't parse as an
    /// object.
    pub async fn resolve(
        &self,
        entry: &ApplicationEntry,
        identity: &Identity,
    ) -> Result<PrivilegeLevel, AuthorizationError> {
        let Some(path) = entry.auth_source() else {
            return Ok(PrivilegeLevel::NoAuth);
        };

        let mut levels = self.load(path).await?;
        let level = levels
            .remove(identity.email())
            .map_or(PrivilegeLevel::NoAuth, PrivilegeLevel::Granted);

        tracing::debug!(
            application = entry.name(),
            email = identity.email(),
            granted = !matches!(level, PrivilegeLevel::NoAuth),
            "resolved privilege level"
        );
        Ok(level)
    }

    /// Read and parse the whole authorization file.
    async fn load(&self, path: &Path) -> Result<Map<String, Value>, AuthorizationError> {
        let bytes = match tokio::time::timeout(self.read_timeout, tokio::fs::read(path)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                return Err(AuthorizationError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                return Err(AuthorizationError::Unreadable {
                    path: path.to_path_buf(),
                    reason: format!("read timed out after {}ms", self.read_timeout.as_millis()),
                });
            }
        };

        serde_json::from_slice(&bytes).map_err(|e| AuthorizationError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
