//! Secret service client contract.
//!
//! [`SecretBackend`] is the seam between the facade and whatever actually
//! talks to the secret service. Production implementations wrap an HTTP
//! client; [`MemorySecretBackend`](crate::MemorySecretBackend) is the
//! in-process reference implementation used in tests and development.
//!
//! # Implementing a Backend
//!
//! 1. Implement [`SecretBackend`] for transit operations and handle creation
//! 2. Implement [`KeyValueOperations`] for the per-namespace handle
//! 3. Map transport failures to [`VaultError::Transport`] / [`VaultError::Timeout`]
//!    and service refusals to [`VaultError::Rejected`]
//!
//! Timeouts, retries and session renewal belong to the implementation. The
//! facade above it is a fail-fast pass-through.
//!
//! [`VaultError::Transport`]: crate::VaultError::Transport
//! [`VaultError::Timeout`]: crate::VaultError::Timeout
//! [`VaultError::Rejected`]: crate::VaultError::Rejected

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::VaultResult,
    types::{KeyValueEngine, KeyValueResponse, SecretEnvelope},
};

/// Client for an external secret/transit-encryption service.
///
/// Implementations must be thread-safe; the facade shares one instance across
/// all callers and never mutates it.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// Encrypts `plaintext` with the transit key at `path`.
    ///
    /// Returns the service's ciphertext encoding unchanged.
    async fn encrypt_transit(&self, path: &str, plaintext: &[u8]) -> VaultResult<String>;

    /// Decrypts `ciphertext` with the transit key at `path`.
    async fn decrypt_transit(&self, path: &str, ciphertext: &str) -> VaultResult<Vec<u8>>;

    /// Creates a handle to the key-value sub-resource mounted at `namespace`.
    ///
    /// Construction may be expensive (session setup, mount discovery), which
    /// is why the facade caches the returned handle per namespace.
    async fn key_value_operations(
        &self,
        namespace: &str,
        engine: KeyValueEngine,
    ) -> VaultResult<Arc<dyn KeyValueOperations>>;
}

/// Handle to the key-value secrets stored under one namespace.
#[async_trait]
pub trait KeyValueOperations: Send + Sync {
    /// Stores `envelope` at `key`, replacing any existing secret.
    async fn put(&self, key: &str, envelope: &SecretEnvelope) -> VaultResult<()>;

    /// Reads the raw response stored at `key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(response))` if a secret exists
    /// - `Ok(None)` if no secret exists at the key
    /// - `Err(...)` on transport or authentication failures
    async fn get(&self, key: &str) -> VaultResult<Option<KeyValueResponse>>;
}
