//! Authentication module.
//!
//! This module holds the application token issuance core: the registry of
//! applications, privilege resolution, claim construction and signing.
//!
//! # Pre-conditions
//! - Applications must be configured with non-empty names and secrets.
//!
//! # Post-conditions
//! - The registry is immutable once loaded.
//!
//! # Invariants
//! - Every application signs with its own secret.

pub mod app_config;
pub mod authorization;
pub mod identity;
pub mod issuer;
pub mod jwt;
pub mod registry;

pub use app_config::{AppConfigError, ApplicationEntry, SigningSecret};
pub use authorization::{AuthorizationError, AuthorizationResolver, PrivilegeLevel};
pub use identity::{Identity, IncompleteIdentity};
pub use issuer::{IssueError, TokenIssuer};
pub use jwt::TokenClaims;
pub use registry::{ApplicationRegistry, RegistryError};
