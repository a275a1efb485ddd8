//! Vault error types and result alias.
//!
//! Every backend implementation maps its internal failures onto
//! [`VaultError`]. The facade never retries or swallows these errors; they
//! reach the caller exactly as the backend produced them.
//!
//! # Error Types
//!
//! - [`VaultError::Configuration`] - Invalid configuration at construction time
//! - [`VaultError::Transport`] - Network or authentication failure talking to the service
//! - [`VaultError::Timeout`] - Transport exceeded its time limit
//! - [`VaultError::Rejected`] - The service refused the request (bad ciphertext, unknown key)
//! - [`VaultError::ContractViolation`] - A key-value response does not have the envelope shape
//! - [`VaultError::Serialization`] - Envelope encoding or decoding failed
//!
//! A missing secret is not an error. Reads report it as
//! [`SecretLookup::NotFound`](crate::SecretLookup::NotFound).
//!
//! # Example
//!
//! ```
//! use trustgate_vault::{VaultError, VaultResult};
//!
//! fn decrypt_stub(ciphertext: &str) -> VaultResult<Vec<u8>> {
//!     Err(VaultError::rejected("decrypt", format!("malformed ciphertext: {ciphertext}")))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A shared error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors that can occur while talking to the secret service.
///
/// Errors preserve their source chain via `#[source]` so structured logging
/// can print the full cause.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases. Downstream match expressions
/// must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum VaultError {
    /// The service configuration is invalid.
    ///
    /// Raised while building a [`VaultConfig`](crate::VaultConfig) or a
    /// [`VaultCommunicationService`](crate::VaultCommunicationService). No
    /// partially constructed value is ever returned alongside this error.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the invalid setting.
        message: String,
    },

    /// Network, TLS or authentication failure talking to the service.
    ///
    /// Fatal for the current call. The facade does not retry it.
    #[error("Transport error: {message}")]
    Transport {
        /// Description of the transport failure.
        message: String,
        /// The underlying error, if one is available.
        #[source]
        source: Option<BoxError>,
    },

    /// The transport gave up waiting for the service.
    #[error("Operation timeout")]
    Timeout,

    /// The service received the request and refused it.
    ///
    /// Covers transit failures such as a malformed ciphertext, an unknown
    /// transit key, or a ciphertext produced under a different key.
    #[error("{operation} rejected: {message}")]
    Rejected {
        /// The operation that was refused (e.g. `"decrypt"`).
        operation: String,
        /// The service's reason.
        message: String,
    },

    /// A key-value response did not carry the expected envelope.
    ///
    /// Returned instead of a "not found" result so that a misconfigured
    /// engine mount or a foreign secret layout surfaces loudly.
    #[error("Contract violation reading '{namespace}/{key}': {message}")]
    ContractViolation {
        /// Namespace the secret was read from.
        namespace: String,
        /// Key within the namespace.
        key: String,
        /// What was wrong with the response.
        message: String,
    },

    /// Envelope encoding or decoding failed.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
        /// The underlying error, if one is available.
        #[source]
        source: Option<BoxError>,
    },
}

impl VaultError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    /// Creates a new `Transport` error with the given message.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into(), source: None }
    }

    /// Creates a new `Transport` error with a message and source error.
    #[must_use]
    pub fn transport_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Creates a new `Rejected` error for the given operation.
    #[must_use]
    pub fn rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rejected { operation: operation.into(), message: message.into() }
    }

    /// Creates a new `ContractViolation` error.
    #[must_use]
    pub fn contract_violation(
        namespace: impl Into<String>,
        key: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ContractViolation {
            namespace: namespace.into(),
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization { message: message.into(), source: None }
    }

    /// Creates a new `Serialization` error with a message and source error.
    #[must_use]
    pub fn serialization_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Serialization { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Returns `true` for failures in reaching the service rather than in
    /// what the service answered.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout)
    }
}
