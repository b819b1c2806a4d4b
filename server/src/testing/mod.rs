//! Shared fixtures for unit tests.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::auth::{ApplicationEntry, Identity};

/// Write `contents` to a fresh temporary authorization file.
///
/// The file is removed when the returned handle is dropped.
pub fn write_auth_file(contents: &str) -> NamedTempFile {
    #[allow(clippy::expect_used)]
    let mut file = NamedTempFile::new().expect("Failed to create auth file");
    #[allow(clippy::expect_used)]
    file.write_all(contents.as_bytes())
        .expect("Failed to write auth file");
    file
}

/// An application entry whose authorization file is `path`.
pub fn app_with_auth_file(name: &str, secret: &str, path: &Path) -> ApplicationEntry {
    #[allow(clippy::expect_used)]
    ApplicationEntry::new(name, secret.as_bytes().to_vec(), Some(path.to_path_buf()))
        .expect("Failed to create application entry")
}

/// A complete identity for `email` with a derived avatar URL.
pub fn identity(email: &str) -> Identity {
    #[allow(clippy::expect_used)]
    Identity::new(email, format!("https://img.example/{email}.png"))
        .expect("Failed to create identity")
}
