//! Server configuration module.
//!
//! Configuration comes from two places:
//!
//! - Environment variables, read by [`ServerConfig::from_env`], that say where
//!   to listen and where the service file lives.
//! - The JSON service file, read by [`ServiceConfig::load`], that lists the
//!   registered applications and their signing secrets.
//!
//! # Environment Variables
//!
//! - `APPAUTH_CONFIG_FILE`: Path to the JSON service file (required)
//! - `APPAUTH_LISTEN_ADDRESS`: Address to bind (default: `127.0.0.1`)
//! - `APPAUTH_LISTEN_PORT`: Port to listen on (default: `15000`)
//!
//! # Service File
//!
//! ```json
//! {
//!   "applications-secrets": { "neutu": "secret-a", "dvid": "secret-b" },
//!   "applications-auth": { "neutu": "/etc/appauth/neutu-auth.json" },
//!   "log-file": "/var/log/appauth.log",
//!   "token-validity-hours": 50000,
//!   "auth-source-timeout-ms": 5000
//! }
//! ```
//!
//! Keys this service does not use (OAuth client settings, certificates and
//! so on) are ignored, so a file shared with the authenticating front end
//! loads unchanged.
//!
//! # Invariants
//!
//! - `listen_port` is always a valid port number
//! - `token_validity_hours` and `auth_source_timeout_ms` are always positive
//! - Application tables keep every key as written, duplicates included, so the
//!   registry can reject them instead of silently keeping the last one

use std::fmt;
use std::marker::PhantomData;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

/// Process-level configuration read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Location of the JSON service file.
    pub config_file: PathBuf,
    /// Address the HTTP listener binds to.
    pub listen_address: IpAddr,
    /// Port to listen on for HTTP connections.
    pub listen_port: u16,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable is missing.
    MissingEnvVar(String),
    /// A setting has an invalid value.
    InvalidValue { name: String, message: String },
    /// The service file could not be opened or read.
    Unreadable { path: PathBuf, reason: String },
    /// The service file is not valid JSON of the expected shape.
    Malformed { path: PathBuf, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEnvVar(name) => {
                write!(f, "missing required environment variable: {name}")
            }
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
            Self::Unreadable { path, reason } => {
                write!(f, "{} cannot be read: {reason}", path.display())
            }
            Self::Malformed { path, reason } => {
                write!(f, "{} is not a valid service file: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl ServerConfig {
    /// Default port for the server.
    pub const DEFAULT_PORT: u16 = 15000;
    /// Default listen address.
    pub const DEFAULT_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `APPAUTH_CONFIG_FILE` is not set or is empty
    /// - `APPAUTH_LISTEN_ADDRESS` is set but not an IP address
    /// - `APPAUTH_LISTEN_PORT` is set but not a valid port number
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a map instead.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let config_file = match lookup("APPAUTH_CONFIG_FILE") {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            Some(_) => {
                return Err(ConfigError::InvalidValue {
                    name: "APPAUTH_CONFIG_FILE".to_string(),
                    message: "must not be empty".to_string(),
                });
            }
            None => return Err(ConfigError::MissingEnvVar("APPAUTH_CONFIG_FILE".to_string())),
        };

        let listen_address = match lookup("APPAUTH_LISTEN_ADDRESS") {
            Some(value) => value.parse::<IpAddr>().map_err(|_| ConfigError::InvalidValue {
                name: "APPAUTH_LISTEN_ADDRESS".to_string(),
                message: format!("'{value}' is not a valid IP address"),
            })?,
            None => Self::DEFAULT_ADDRESS,
        };

        let listen_port = match lookup("APPAUTH_LISTEN_PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                name: "APPAUTH_LISTEN_PORT".to_string(),
                message: format!("'{value}' is not a valid port number (must be 1-65535)"),
            })?,
            None => Self::DEFAULT_PORT,
        };

        Ok(Self {
            config_file,
            listen_address,
            listen_port,
        })
    }
}

/// Contents of the JSON service file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServiceConfig {
    /// Application name to HS256 signing secret, in file order.
    #[serde(deserialize_with = "ordered_entries")]
    pub applications_secrets: Vec<(String, String)>,
    /// Application name to authorization file, in file order.
    #[serde(default, deserialize_with = "ordered_entries")]
    pub applications_auth: Vec<(String, PathBuf)>,
    /// Append logs here instead of stdout.
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_token_validity_hours")]
    pub token_validity_hours: u64,
    #[serde(default = "default_auth_source_timeout_ms")]
    pub auth_source_timeout_ms: u64,
}

const fn default_token_validity_hours() -> u64 {
    ServiceConfig::DEFAULT_TOKEN_VALIDITY_HOURS
}

const fn default_auth_source_timeout_ms() -> u64 {
    ServiceConfig::DEFAULT_AUTH_SOURCE_TIMEOUT_MS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            applications_secrets: Vec::new(),
            applications_auth: Vec::new(),
            log_file: None,
            token_validity_hours: Self::DEFAULT_TOKEN_VALIDITY_HOURS,
            auth_source_timeout_ms: Self::DEFAULT_AUTH_SOURCE_TIMEOUT_MS,
        }
    }
}

impl ServiceConfig {
    /// Validity window applied when the file doesn't set one.
    pub const DEFAULT_TOKEN_VALIDITY_HOURS: u64 = 50_000;
    /// Upper bound on reading one authorization file.
    pub const DEFAULT_AUTH_SOURCE_TIMEOUT_MS: u64 = 5_000;

    /// Read and validate the service file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Unreadable` if the file can't be read,
    /// `ConfigError::Malformed` if it isn't the expected JSON, and
    /// `ConfigError::InvalidValue` if a numeric setting is zero or too large.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config = Self::parse(&contents).map_err(|e| ConfigError::Malformed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse service file contents without validating them.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if `contents` is not a service file.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    /// Check value ranges that JSON types can't express.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_validity_hours == 0 {
            return Err(ConfigError::InvalidValue {
                name: "token-validity-hours".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.token_validity_hours.checked_mul(3600).is_none() {
            return Err(ConfigError::InvalidValue {
                name: "token-validity-hours".to_string(),
                message: format!("{} hours is too large", self.token_validity_hours),
            });
        }
        if self.auth_source_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                name: "auth-source-timeout-ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn token_validity(&self) -> Duration {
        Duration::from_secs(self.token_validity_hours.saturating_mul(3600))
    }

    #[must_use]
    pub const fn auth_source_timeout(&self) -> Duration {
        Duration::from_millis(self.auth_source_timeout_ms)
    }
}

/// Deserialize a JSON object into `(key, value)` pairs, keeping duplicates.
fn ordered_entries<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct EntriesVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object keyed by application name")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, V>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(EntriesVisitor(PhantomData))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_default_values() {
        assert_eq!(ServerConfig::DEFAULT_PORT, 15000);
        assert_eq!(ServiceConfig::DEFAULT_TOKEN_VALIDITY_HOURS, 50_000);
        assert_eq!(
            ServiceConfig::default().token_validity(),
            Duration::from_secs(50_000 * 3600)
        );
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = ServerConfig::from_lookup(lookup_from(&[(
            "APPAUTH_CONFIG_FILE",
            "/etc/appauth.json",
        )]))
        .expect("valid config");

        assert_eq!(config.config_file, PathBuf::from("/etc/appauth.json"));
        assert_eq!(config.listen_address, ServerConfig::DEFAULT_ADDRESS);
        assert_eq!(config.listen_port, ServerConfig::DEFAULT_PORT);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("APPAUTH_CONFIG_FILE", "/etc/appauth.json"),
            ("APPAUTH_LISTEN_ADDRESS", "0.0.0.0"),
            ("APPAUTH_LISTEN_PORT", "8080"),
        ]))
        .expect("valid config");

        assert_eq!(config.listen_address, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.listen_port, 8080);
    }

    #[test]
    fn test_from_lookup_missing_config_file() {
        let result = ServerConfig::from_lookup(lookup_from(&[]));
        assert_eq!(
            result,
            Err(ConfigError::MissingEnvVar("APPAUTH_CONFIG_FILE".to_string()))
        );
    }

    #[test]
    fn test_from_lookup_invalid_port() {
        let result = ServerConfig::from_lookup(lookup_from(&[
            ("APPAUTH_CONFIG_FILE", "/etc/appauth.json"),
            ("APPAUTH_LISTEN_PORT", "99999"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref name, .. }) if name == "APPAUTH_LISTEN_PORT"
        ));
    }

    #[test]
    fn test_parse_full_service_file() {
        let config = ServiceConfig::parse(
            r#"{
                "oauthclient-id": "ignored",
                "applications-secrets": {"neutu": "s1", "dvid": "s2"},
                "applications-auth": {"neutu": "/data/neutu.json"},
                "log-file": "/tmp/appauth.log",
                "token-validity-hours": 12,
                "auth-source-timeout-ms": 250
            }"#,
        )
        .expect("valid service file");

        assert_eq!(
            config.applications_secrets,
            vec![
                ("neutu".to_string(), "s1".to_string()),
                ("dvid".to_string(), "s2".to_string())
            ]
        );
        assert_eq!(
            config.applications_auth,
            vec![("neutu".to_string(), PathBuf::from("/data/neutu.json"))]
        );
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/appauth.log")));
        assert_eq!(config.token_validity(), Duration::from_secs(12 * 3600));
        assert_eq!(config.auth_source_timeout(), Duration::from_millis(250));
    }

    #[test]
    fn test_parse_keeps_duplicate_keys() {
        let config = ServiceConfig::parse(
            r#"{"applications-secrets": {"neutu": "s1", "neutu": "s2"}}"#,
        )
        .expect("valid service file");

        assert_eq!(config.applications_secrets.len(), 2);
        assert!(config.applications_auth.is_empty());
        assert_eq!(
            config.token_validity_hours,
            ServiceConfig::DEFAULT_TOKEN_VALIDITY_HOURS
        );
    }

    #[test]
    fn test_parse_requires_secrets() {
        assert!(ServiceConfig::parse(r#"{"applications-auth": {}}"#).is_err());
        assert!(ServiceConfig::parse(r#"{"applications-secrets": ["neutu"]}"#).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_window() {
        let config = ServiceConfig {
            token_validity_hours: 0,
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref name, .. }) if name == "token-validity-hours"
        ));
    }

    #[test]
    fn test_validate_rejects_overflowing_window() {
        let config = ServiceConfig {
            token_validity_hours: u64::MAX / 3600 + 1,
            ..ServiceConfig::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidValue { name, message }) => {
                assert_eq!(name, "token-validity-hours");
                assert!(message.ends_with("is too large"));
            }
            other => panic!("expected InvalidValue, got {other:?}"),
        }

        let largest = ServiceConfig {
            token_validity_hours: u64::MAX / 3600,
            ..ServiceConfig::default()
        };
        assert!(largest.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = ServiceConfig {
            auth_source_timeout_ms: 0,
            ..ServiceConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref name, .. }) if name == "auth-source-timeout-ms"
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"applications-secrets": {{"neutu": "s1"}}}}"#).expect("write");

        let config = ServiceConfig::load(file.path()).expect("loads");
        assert_eq!(config.applications_secrets.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("missing.json");

        assert!(matches!(
            ServiceConfig::load(&path),
            Err(ConfigError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_load_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "not json").expect("write");

        assert!(matches!(
            ServiceConfig::load(file.path()),
            Err(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::MissingEnvVar("TEST_VAR".to_string()).to_string(),
            "missing required environment variable: TEST_VAR"
        );
        assert_eq!(
            ConfigError::InvalidValue {
                name: "TEST_VAR".to_string(),
                message: "bad value".to_string(),
            }
            .to_string(),
            "invalid value for TEST_VAR: bad value"
        );
        assert_eq!(
            ConfigError::Unreadable {
                path: PathBuf::from("/etc/appauth.json"),
                reason: "not found".to_string(),
            }
            .to_string(),
            "/etc/appauth.json cannot be read: not found"
        );
    }
}
