//! Authenticated identity handed to the issuer.

use chrono::{DateTime, Utc};

/// Result of a successful login, from which a bearer token is issued.
///
/// `principal` and `name` are optional here because upstream authenticators
/// may not populate them; the issuer rejects tokens missing either.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticationToken {
    /// Authenticated principal; becomes the `sub` claim.
    pub principal: Option<String>,
    /// Display username; becomes the `preferred_username` claim.
    pub name: Option<String>,
    /// Identity issuer URL; URL-encoded into `iss` and `aud`.
    pub issuer: String,
    /// When the login expires; becomes the `exp` claim.
    pub expiration: DateTime<Utc>,
}

impl AuthenticationToken {
    /// Creates a token for `principal` with the same value as username.
    pub fn new(
        principal: impl Into<String>,
        issuer: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        let principal = principal.into();
        Self {
            name: Some(principal.clone()),
            principal: Some(principal),
            issuer: issuer.into(),
            expiration,
        }
    }

    /// Replaces the username.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
