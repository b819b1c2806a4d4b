//! Authenticated user identity.
//!
//! The identity is established by the authenticating front end and reaches
//! this service through the request context. Nothing here verifies it; it is
//! only checked for completeness.

/// Error returned when the authenticator supplied an empty or missing field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncompleteIdentity;

impl std::fmt::Display for IncompleteIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot get authenticated email")
    }
}

impl std::error::Error for IncompleteIdentity {}

/// A verified user, as asserted by the external authenticator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    email: String,
    image_url: String,
}

impl Identity {
    /// Build an identity from the authenticator's fields.
    ///
    /// # Errors
    /// Returns `IncompleteIdentity` if either field is empty.
    pub fn new(
        email: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Result<Self, IncompleteIdentity> {
        let email = email.into();
        let image_url = image_url.into();
        if email.is_empty() || image_url.is_empty() {
            return Err(IncompleteIdentity);
        }
        Ok(Self { email, image_url })
    }

    /// The user's stable identifier, used as the authorization lookup key.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Display reference (avatar URL). Never used for authorization.
    #[must_use]
    pub fn image_url(&self) -> &str {
        &self.image_url
    }
}
