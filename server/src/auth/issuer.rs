//! Application token issuance.
//!
//! Turns an authenticated identity and an application name into a signed
//! token:
//!
//! 1. Look the application up in the registry.
//! 2. Resolve the user's privilege level from the application's
//!    authorization file, if it has one.
//! 3. Build the claims with an expiration of now plus the validity window.
//! 4. Sign them with the application's own HS256 secret.
//!
//! # Invariants
//! - Tokens for one application are signed only with that application's
//!   secret, so they never verify under another application's secret.
//! - The issuer holds no mutable state. Concurrent issues are independent.

use std::sync::Arc;
use std::time::Duration;

use super::app_config::ApplicationEntry;
use super::authorization::{AuthorizationError, AuthorizationResolver};
use super::identity::{Identity, IncompleteIdentity};
use super::jwt::{SigningError, TokenClaims, sign_hs256};
use super::registry::ApplicationRegistry;

/// Errors that can occur while issuing a token.
///
/// `Display` output is sent to clients, so it names the application but
/// never file paths or key material. The detailed cause is logged instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    /// The authenticated identity is missing its email or image URL.
    IdentityIncomplete,
    /// The application is not registered.
    UnknownApplication(String),
    /// The application's authorization file could not be read.
    AuthSourceUnreadable(String),
    /// The application's authorization file is not an email-keyed object.
    AuthSourceMalformed(String),
    /// The token could not be signed.
    SigningFailed(String),
}

impl IssueError {
    /// Whether the caller, rather than this service, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::SigningFailed(_))
    }
}

impl std::fmt::Display for IssueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IdentityIncomplete => write!(f, "cannot get authenticated email"),
            Self::UnknownApplication(app) => write!(f, "cannot find provided app: {app}"),
            Self::AuthSourceUnreadable(app) => write!(
                f,
                "authorization file cannot be read for application: {app}"
            ),
            Self::AuthSourceMalformed(app) => {
                write!(f, "error reading authorization file for application: {app}")
            }
            Self::SigningFailed(app) => write!(f, "failed to sign token for application: {app}"),
        }
    }
}

impl std::error::Error for IssueError {}

impl From<IncompleteIdentity> for IssueError {
    fn from(_: IncompleteIdentity) -> Self {
        Self::IdentityIncomplete
    }
}

/// Mints application tokens.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    registry: Arc<ApplicationRegistry>,
    resolver: AuthorizationResolver,
    validity: Duration,
}

impl TokenIssuer {
    /// Create an issuer over `registry`.
    ///
    /// `validity` is added to the issue time to form each token's `exp`; only
    /// whole seconds are kept.
    #[must_use]
    pub const fn new(
        registry: Arc<ApplicationRegistry>,
        resolver: AuthorizationResolver,
        validity: Duration,
    ) -> Self {
        Self {
            registry,
            resolver,
            validity,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ApplicationRegistry {
        &self.registry
    }

    /// Names of all registered applications.
    #[must_use]
    pub fn list_applications(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Issue a token for `identity` and the application named `app_name`.
    ///
    /// # Errors
    /// Returns `IssueError::UnknownApplication` if the application isn't
    /// registered, the authorization errors if its file can't be used, and
    /// `IssueError::SigningFailed` if signing fails.
    pub async fn issue(&self, identity: &Identity, app_name: &str) -> Result<String, IssueError> {
        self.issue_at(identity, app_name, jsonwebtoken::get_current_timestamp())
            .await
    }

    /// Like [`TokenIssuer::issue`] with an explicit issue time in Unix seconds.
    ///
    /// # Errors
    /// Same as [`TokenIssuer::issue`].
    pub async fn issue_at(
        &self,
        identity: &Identity,
        app_name: &str,
        now: u64,
    ) -> Result<String, IssueError> {
        let Some(entry) = self.registry.lookup(app_name) else {
            tracing::debug!(application = app_name, "token requested for unknown application");
            return Err(IssueError::UnknownApplication(app_name.to_string()));
        };

        let level = self
            .resolver
            .resolve(entry, identity)
            .await
            .map_err(|e| authorization_failure(entry, &e))?;

        let claims = TokenClaims {
            email: identity.email().to_string(),
            level,
            image_url: identity.image_url().to_string(),
            iat: now,
            exp: now.saturating_add(self.validity.as_secs()),
        };

        let token = sign_hs256(&claims, entry.signing_secret())
            .map_err(|e| signing_failure(entry, &e))?;

        tracing::info!(
            application = entry.name(),
            email = identity.email(),
            exp = claims.exp,
            "issued application token"
        );
        Ok(token)
    }
}

fn authorization_failure(entry: &ApplicationEntry, error: &AuthorizationError) -> IssueError {
    tracing::warn!(application = entry.name(), "{error}");
    match error {
        AuthorizationError::Unreadable { .. } => {
            IssueError::AuthSourceUnreadable(entry.name().to_string())
        }
        AuthorizationError::Malformed { .. } => {
            IssueError::AuthSourceMalformed(entry.name().to_string())
        }
    }
}

fn signing_failure(entry: &ApplicationEntry, error: &SigningError) -> IssueError {
    tracing::error!(application = entry.name(), "{error}");
    IssueError::SigningFailed(entry.name().to_string())
}
