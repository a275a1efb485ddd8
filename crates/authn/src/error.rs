//! Authentication error types.
//!
//! This module defines errors that can occur while issuing bearer tokens,
//! managing signing keys and verifying compact JWS tokens.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// A shared error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Authentication errors.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases. Downstream match expressions must include a
/// wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum AuthError {
    // ========== Issuance errors ==========
    /// The identity token is missing a required attribute or is already
    /// expired. Raised before any signer is requested.
    #[error("Precondition failed: {message}")]
    Precondition {
        /// Which precondition failed.
        message: String,
    },

    /// The resolved signer failed to produce a signature, or its algorithm
    /// is not allowed for issuance.
    #[error("Signing failed for algorithm [{algorithm}] key identifier [{kid}]")]
    Signing {
        /// JWS algorithm name, e.g. `EdDSA`.
        algorithm: String,
        /// Key identifier of the signer.
        kid: String,
        /// Underlying failure.
        #[source]
        source: BoxError,
    },

    /// No signing key is valid through the requested expiration.
    #[error("No signing key valid through {expiration}")]
    NoEligibleSigner {
        /// Expiration the key had to cover.
        expiration: DateTime<Utc>,
    },

    /// The key source could not be reached.
    #[error("Key provider error: {message}")]
    KeyProvider {
        /// Description of the failure.
        message: String,
        /// Underlying failure, if any.
        #[source]
        source: Option<BoxError>,
    },

    // ========== Verification errors ==========
    /// Malformed JWT that cannot be decoded.
    #[error("Invalid token format: {0}")]
    InvalidTokenFormat(String),

    /// Token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// Token not yet valid (`nbf` claim in future).
    #[error("Token not yet valid")]
    TokenNotYetValid,

    /// Signature verification failed.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Audience doesn't match expected value.
    #[error("Invalid audience: {0}")]
    InvalidAudience(String),

    /// Required claim is missing.
    #[error("Missing claim: {0}")]
    MissingClaim(String),

    /// Algorithm not in allowed list.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    // ========== Key management errors ==========
    /// Signing key not found.
    #[error("Signing key not found: {kid}")]
    KeyNotFound {
        /// Key ID that was not found.
        kid: String,
    },

    /// Signing key has been revoked.
    #[error("Signing key revoked: {kid}")]
    KeyRevoked {
        /// Key ID that was revoked.
        kid: String,
    },

    /// Invalid public key format.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
}

impl AuthError {
    /// Creates a `Precondition` error.
    #[must_use]
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition { message: message.into() }
    }

    /// Creates a `Signing` error wrapping `source`.
    #[must_use]
    pub fn signing(
        algorithm: impl Into<String>,
        kid: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Signing { algorithm: algorithm.into(), kid: kid.into(), source: Arc::new(source) }
    }

    /// Creates a `NoEligibleSigner` error.
    #[must_use]
    pub fn no_eligible_signer(expiration: DateTime<Utc>) -> Self {
        Self::NoEligibleSigner { expiration }
    }

    /// Creates a `KeyProvider` error with the given message.
    #[must_use]
    pub fn key_provider(message: impl Into<String>) -> Self {
        Self::KeyProvider { message: message.into(), source: None }
    }

    /// Creates a `KeyProvider` error with a message and source error.
    #[must_use]
    pub fn key_provider_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::KeyProvider { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates an `InvalidTokenFormat` error.
    #[must_use]
    pub fn invalid_token_format(message: impl Into<String>) -> Self {
        Self::InvalidTokenFormat(message.into())
    }

    /// Creates a `TokenExpired` error.
    #[must_use]
    pub fn token_expired() -> Self {
        Self::TokenExpired
    }

    /// Creates a `TokenNotYetValid` error.
    #[must_use]
    pub fn token_not_yet_valid() -> Self {
        Self::TokenNotYetValid
    }

    /// Creates an `InvalidAudience` error.
    #[must_use]
    pub fn invalid_audience(message: impl Into<String>) -> Self {
        Self::InvalidAudience(message.into())
    }

    /// Creates a `MissingClaim` error.
    #[must_use]
    pub fn missing_claim(claim: impl Into<String>) -> Self {
        Self::MissingClaim(claim.into())
    }

    /// Creates an `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm(message.into())
    }

    /// Creates a `KeyNotFound` error.
    #[must_use]
    pub fn key_not_found(kid: impl Into<String>) -> Self {
        Self::KeyNotFound { kid: kid.into() }
    }

    /// Creates a `KeyRevoked` error.
    #[must_use]
    pub fn key_revoked(kid: impl Into<String>) -> Self {
        Self::KeyRevoked { kid: kid.into() }
    }

    /// Creates an `InvalidPublicKey` error.
    #[must_use]
    pub fn invalid_public_key(message: impl Into<String>) -> Self {
        Self::InvalidPublicKey(message.into())
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidToken => {
                AuthError::InvalidTokenFormat("Invalid JWT structure".into())
            },
            ErrorKind::InvalidSignature => AuthError::InvalidSignature,
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidAudience => {
                AuthError::InvalidAudience("Audience validation failed".into())
            },
            ErrorKind::InvalidAlgorithm => {
                AuthError::UnsupportedAlgorithm("Algorithm does not match key".into())
            },
            ErrorKind::InvalidKeyFormat => AuthError::InvalidPublicKey(format!("JWT error: {err}")),
            ErrorKind::MissingRequiredClaim(claim) => AuthError::MissingClaim(claim.clone()),
            _ => AuthError::InvalidTokenFormat(format!("JWT error: {err}")),
        }
    }
}

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;
