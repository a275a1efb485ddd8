//! Public facade over the secret service.
//!
//! [`VaultCommunicationService`] combines transit encryption with key-value
//! secret storage. It adds exactly two things on top of the backend: a
//! per-namespace handle cache and enforcement of the stored-secret envelope.
//! Everything else is passed straight through, so backend failures reach the
//! caller unchanged and without retries.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use trustgate_vault::{MemorySecretBackend, SecretLookup, VaultCommunicationService, VaultConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let config = VaultConfig::builder().uri("http://127.0.0.1:8200").token("root").build().unwrap();
//! let service = VaultCommunicationService::new(config, Arc::new(MemorySecretBackend::new())).unwrap();
//!
//! let ciphertext = service.encrypt("transit/app", b"card-number").await.unwrap();
//! assert_eq!(service.decrypt("transit/app", &ciphertext).await.unwrap(), b"card-number");
//!
//! service.write_key_value_secret("kv/app", "db-password", "hunter2").await.unwrap();
//! let lookup = service.read_key_value_secret("kv/app", "db-password").await.unwrap();
//! assert_eq!(lookup, SecretLookup::Found(Some("hunter2".to_owned())));
//! # });
//! ```

use std::sync::Arc;

use crate::{
    backend::SecretBackend,
    cache::KeyValueOperationsCache,
    config::VaultConfig,
    error::{VaultError, VaultResult},
    types::{ENVELOPE_VALUE_FIELD, KeyValueResponse, SecretEnvelope, SecretLookup},
};

/// Transit encryption and key-value secrets over a shared [`SecretBackend`].
///
/// Safe to share across tasks (`Arc<VaultCommunicationService>`); every
/// operation takes `&self`.
pub struct VaultCommunicationService {
    config: VaultConfig,
    backend: Arc<dyn SecretBackend>,
    key_value_operations: KeyValueOperationsCache,
}

impl VaultCommunicationService {
    /// Creates a service from a configuration and a backend client.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if `config` does not validate.
    pub fn new(config: VaultConfig, backend: Arc<dyn SecretBackend>) -> VaultResult<Self> {
        config.validate()?;

        let key_value_operations =
            KeyValueOperationsCache::new(Arc::clone(&backend), config.kv_engine());

        tracing::debug!(uri = %config.uri(), kv_engine = %config.kv_engine(), "vault service created");

        Ok(Self { config, backend, key_value_operations })
    }

    /// Encrypts `plaintext` with the transit key at `transit_path`.
    ///
    /// Returns the service's ciphertext encoding unchanged. No local
    /// validation of the plaintext is performed.
    ///
    /// # Errors
    ///
    /// Propagates the backend's error as-is.
    #[tracing::instrument(skip(self, plaintext), fields(len = plaintext.len()))]
    pub async fn encrypt(&self, transit_path: &str, plaintext: &[u8]) -> VaultResult<String> {
        self.backend.encrypt_transit(transit_path, plaintext).await.inspect_err(|e| {
            tracing::warn!(transit_path, error = %e, "transit encrypt failed");
        })
    }

    /// Decrypts a ciphertext previously produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// Propagates the backend's error as-is, e.g. [`VaultError::Rejected`] for
    /// a malformed ciphertext or one produced under a different key.
    #[tracing::instrument(skip(self, ciphertext))]
    pub async fn decrypt(&self, transit_path: &str, ciphertext: &str) -> VaultResult<Vec<u8>> {
        self.backend.decrypt_transit(transit_path, ciphertext).await.inspect_err(|e| {
            tracing::warn!(transit_path, error = %e, "transit decrypt failed");
        })
    }

    /// Stores `value` as `{"value": value}` at `key` under `namespace`.
    ///
    /// Overwrites any existing secret unconditionally.
    ///
    /// # Errors
    ///
    /// Propagates handle construction and backend write errors as-is.
    #[tracing::instrument(skip(self, value))]
    pub async fn write_key_value_secret(
        &self,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> VaultResult<()> {
        let operations = self.key_value_operations.get_or_create(namespace).await?;
        operations.put(key, &SecretEnvelope::new(value)).await.inspect_err(|e| {
            tracing::warn!(namespace, key, error = %e, "key-value write failed");
        })
    }

    /// Reads the secret stored at `key` under `namespace`.
    ///
    /// # Returns
    ///
    /// - [`SecretLookup::Found`] with `Some(value)` for a stored value
    /// - [`SecretLookup::Found`] with `None` if the stored value is an explicit `null`
    /// - [`SecretLookup::NotFound`] if no secret exists at the key
    ///
    /// # Errors
    ///
    /// - [`VaultError::ContractViolation`] if the response has no `data`, the `data` has no
    ///   `value` field, or `value` is neither a string nor `null`
    /// - Handle construction and backend read errors as-is
    #[tracing::instrument(skip(self))]
    pub async fn read_key_value_secret(
        &self,
        namespace: &str,
        key: &str,
    ) -> VaultResult<SecretLookup> {
        let operations = self.key_value_operations.get_or_create(namespace).await?;
        let response = operations.get(key).await.inspect_err(|e| {
            tracing::warn!(namespace, key, error = %e, "key-value read failed");
        })?;

        match response {
            None => {
                tracing::debug!(namespace, key, "no secret at key");
                Ok(SecretLookup::NotFound)
            },
            Some(response) => {
                let envelope = extract_envelope(namespace, key, response).inspect_err(|e| {
                    tracing::warn!(namespace, key, error = %e, "malformed key-value response");
                })?;
                Ok(SecretLookup::Found(envelope.value))
            },
        }
    }

    /// Returns the configuration this service was built from.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Returns the handle cache, for inspection.
    #[must_use]
    pub fn key_value_operations(&self) -> &KeyValueOperationsCache {
        &self.key_value_operations
    }
}

/// Pulls the envelope out of a raw response, enforcing its shape.
fn extract_envelope(
    namespace: &str,
    key: &str,
    response: KeyValueResponse,
) -> VaultResult<SecretEnvelope> {
    let data = response
        .data
        .ok_or_else(|| VaultError::contract_violation(namespace, key, "response has no data"))?;

    let object = data.as_object().ok_or_else(|| {
        VaultError::contract_violation(namespace, key, "response data is not an object")
    })?;

    if !object.contains_key(ENVELOPE_VALUE_FIELD) {
        return Err(VaultError::contract_violation(
            namespace,
            key,
            format!("response data has no '{ENVELOPE_VALUE_FIELD}' field"),
        ));
    }

    serde_json::from_value(data).map_err(|e| {
        VaultError::contract_violation(
            namespace,
            key,
            format!("'{ENVELOPE_VALUE_FIELD}' is not a string or null: {e}"),
        )
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        assert_vault_error,
        memory::MemorySecretBackend,
        testutil::{ScriptedBackend, test_config},
    };

    fn memory_service() -> VaultCommunicationService {
        VaultCommunicationService::new(test_config(), Arc::new(MemorySecretBackend::new())).unwrap()
    }

    fn scripted_service(response: Option<KeyValueResponse>) -> VaultCommunicationService {
        VaultCommunicationService::new(test_config(), Arc::new(ScriptedBackend::new(response)))
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = test_config();
        config.uri = "vault.internal".into();

        let result = VaultCommunicationService::new(config, Arc::new(MemorySecretBackend::new()));
        assert!(matches!(result, Err(VaultError::Configuration { .. })));
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let service = memory_service();

        service.write_key_value_secret("kv/app", "api-key", "abc123").await.unwrap();
        let lookup = service.read_key_value_secret("kv/app", "api-key").await.unwrap();

        assert_eq!(lookup, SecretLookup::Found(Some("abc123".into())));
    }

    #[tokio::test]
    async fn test_read_missing_key_is_not_found() {
        let service = memory_service();

        let lookup = service.read_key_value_secret("kv/empty", "missing-key").await.unwrap();
        assert_eq!(lookup, SecretLookup::NotFound);
    }

    #[tokio::test]
    async fn test_write_overwrites_existing_value() {
        let service = memory_service();

        service.write_key_value_secret("kv/app", "token", "first").await.unwrap();
        service.write_key_value_secret("kv/app", "token", "second").await.unwrap();

        let lookup = service.read_key_value_secret("kv/app", "token").await.unwrap();
        assert_eq!(lookup.value(), Some("second"));
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let service = memory_service();

        service.write_key_value_secret("kv/a", "shared", "from-a").await.unwrap();

        let lookup = service.read_key_value_secret("kv/b", "shared").await.unwrap();
        assert_eq!(lookup, SecretLookup::NotFound);
        assert_eq!(service.key_value_operations().len().await, 2);
    }

    #[tokio::test]
    async fn test_explicit_null_is_found_without_value() {
        let response = KeyValueResponse { data: Some(json!({"value": null})) };
        let service = scripted_service(Some(response));

        let lookup = service.read_key_value_secret("kv/app", "nullable").await.unwrap();
        assert_eq!(lookup, SecretLookup::Found(None));
    }

    #[tokio::test]
    async fn test_extra_fields_are_ignored() {
        let response =
            KeyValueResponse { data: Some(json!({"value": "v", "owner": "someone-else"})) };
        let service = scripted_service(Some(response));

        let lookup = service.read_key_value_secret("kv/app", "k").await.unwrap();
        assert_eq!(lookup.value(), Some("v"));
    }

    #[tokio::test]
    async fn test_missing_data_is_contract_violation() {
        let service = scripted_service(Some(KeyValueResponse { data: None }));

        let result = service.read_key_value_secret("kv/app", "k").await;
        assert!(
            matches!(&result, Err(VaultError::ContractViolation { namespace, key, message })
                if namespace == "kv/app" && key == "k" && message.contains("no data")),
            "got: {result:?}"
        );
    }

    #[tokio::test]
    async fn test_missing_value_field_is_contract_violation() {
        let response = KeyValueResponse { data: Some(json!({"password": "p"})) };
        let service = scripted_service(Some(response));

        let result = service.read_key_value_secret("kv/app", "k").await;
        assert_vault_error!(result, ContractViolation);
    }

    #[tokio::test]
    async fn test_non_string_value_is_contract_violation() {
        let response = KeyValueResponse { data: Some(json!({"value": 42})) };
        let service = scripted_service(Some(response));

        let result = service.read_key_value_secret("kv/app", "k").await;
        assert_vault_error!(result, ContractViolation);
    }

    #[tokio::test]
    async fn test_non_object_data_is_contract_violation() {
        let response = KeyValueResponse { data: Some(json!(["value"])) };
        let service = scripted_service(Some(response));

        let result = service.read_key_value_secret("kv/app", "k").await;
        assert_vault_error!(result, ContractViolation);
    }

    #[tokio::test]
    async fn test_transit_round_trip() {
        let service = memory_service();

        let ciphertext = service.encrypt("transit/app", b"\x00\xffbinary").await.unwrap();
        assert!(ciphertext.starts_with("vault:v1:"));

        let plaintext = service.decrypt("transit/app", &ciphertext).await.unwrap();
        assert_eq!(plaintext, b"\x00\xffbinary");
    }

    #[tokio::test]
    async fn test_decrypt_failure_is_surfaced_as_is() {
        let service = memory_service();

        let result = service.decrypt("transit/app", "not-a-ciphertext").await;
        assert!(
            matches!(&result, Err(VaultError::Rejected { operation, .. }) if operation == "decrypt"),
            "got: {result:?}"
        );
    }
}
