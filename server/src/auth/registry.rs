//! Application registry.
//!
//! Holds every registered application, keyed by name, for the lifetime of the
//! process. The registry is built once at startup from the service
//! configuration and is read-only afterwards, so request handlers share it
//! through an `Arc` without any locking.
//!
//! # Pre-conditions
//! - Application names are unique in the configuration.
//! - Every authorization file is declared for a registered application.
//!
//! # Post-conditions
//! - A constructed registry never changes.
//!
//! # Invariants
//! - Every entry has a non-empty name and a non-empty signing secret.
//! - `names()` contains each registered application exactly once.

use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use super::app_config::{AppConfigError, ApplicationEntry};
use crate::config::ServiceConfig;

/// Errors that can occur while building the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The same application name was configured more than once.
    DuplicateApplication(String),
    /// An authorization file was configured for an application without a secret.
    UnknownAuthApplication(String),
    /// An application entry failed validation.
    InvalidEntry(AppConfigError),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateApplication(name) => {
                write!(f, "application '{name}' is configured more than once")
            }
            Self::UnknownAuthApplication(name) => write!(
                f,
                "authorization file configured for unregistered application '{name}'"
            ),
            Self::InvalidEntry(e) => write!(f, "invalid application entry: {e}"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidEntry(e) => Some(e),
            Self::DuplicateApplication(_) | Self::UnknownAuthApplication(_) => None,
        }
    }
}

impl From<AppConfigError> for RegistryError {
    fn from(e: AppConfigError) -> Self {
        Self::InvalidEntry(e)
    }
}

/// Immutable table of registered applications.
#[derive(Debug, Default)]
pub struct ApplicationRegistry {
    applications: HashMap<String, ApplicationEntry>,
}

impl ApplicationRegistry {
    /// Build a registry from already-validated entries.
    ///
    /// # Errors
    /// Returns `RegistryError::DuplicateApplication` if two entries share a name.
    pub fn new(
        entries: impl IntoIterator<Item = ApplicationEntry>,
    ) -> Result<Self, RegistryError> {
        let mut applications = HashMap::new();
        for entry in entries {
            let name = entry.name().to_string();
            if applications.insert(name.clone(), entry).is_some() {
                return Err(RegistryError::DuplicateApplication(name));
            }
        }
        Ok(Self { applications })
    }

    /// Build the registry from the parsed service configuration.
    ///
    /// # Errors
    /// Returns an error if a name is duplicated in either table, an
    /// authorization file names an unregistered application, or an entry
    /// fails validation.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, RegistryError> {
        let mut auth_sources: HashMap<&str, PathBuf> = HashMap::new();
        for (name, path) in &config.applications_auth {
            if auth_sources.insert(name.as_str(), path.clone()).is_some() {
                return Err(RegistryError::DuplicateApplication(name.clone()));
            }
        }

        let mut entries = Vec::with_capacity(config.applications_secrets.len());
        for (name, secret) in &config.applications_secrets {
            let auth_source = auth_sources.remove(name.as_str());
            entries.push(ApplicationEntry::new(
                name.clone(),
                secret.as_bytes().to_vec(),
                auth_source,
            )?);
        }

        // Anything left over has no matching secret.
        if let Some(name) = auth_sources.keys().min() {
            return Err(RegistryError::UnknownAuthApplication((*name).to_string()));
        }

        Self::new(entries)
    }

    /// Look up an application by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ApplicationEntry> {
        self.applications.get(name)
    }

    /// Names of every registered application, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.applications
            .keys()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.applications.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applications.is_empty()
    }
}
