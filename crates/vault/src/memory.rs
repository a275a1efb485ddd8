//! In-memory secret backend.
//!
//! [`MemorySecretBackend`] implements [`SecretBackend`] entirely in process:
//! transit keys are generated on first use of a path and key-value secrets
//! live in per-namespace maps. It is the reference implementation for tests
//! and local development.
//!
//! # Features
//!
//! - **Thread-safe**: uses [`parking_lot::RwLock`] for concurrent access
//! - **Real encryption**: transit ciphertexts are XChaCha20-Poly1305 sealed, so a ciphertext
//!   decrypts only under the path that produced it
//! - **Service-shaped ciphertext**: `vault:v1:<base64(nonce || ciphertext)>`
//! - **Shared namespaces**: every handle for a namespace sees the same data, like handles to the
//!   same mount on a real service
//!
//! # Limitations
//!
//! - Nothing is persisted; keys and secrets are lost when the backend is dropped
//! - Transit keys never rotate, so the ciphertext version is always `v1`
//! - The v2 engine is accepted but not versioned

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};
use fail::fail_point;
use parking_lot::RwLock;
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use crate::{
    backend::{KeyValueOperations, SecretBackend},
    error::{VaultError, VaultResult},
    types::{KeyValueEngine, KeyValueResponse, SecretEnvelope},
};

/// Prefix of every ciphertext this backend produces.
pub const CIPHERTEXT_PREFIX: &str = "vault:v1:";

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 24;

type TransitKey = Zeroizing<[u8; KEY_SIZE]>;
type NamespaceData = Arc<RwLock<HashMap<String, KeyValueResponse>>>;

/// In-process [`SecretBackend`].
///
/// # Example
///
/// ```
/// use trustgate_vault::{KeyValueEngine, MemorySecretBackend, SecretBackend, SecretEnvelope};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let backend = MemorySecretBackend::new();
///
/// let ciphertext = backend.encrypt_transit("transit/app", b"hello").await.unwrap();
/// assert!(ciphertext.starts_with("vault:v1:"));
///
/// let kv = backend.key_value_operations("kv/app", KeyValueEngine::V1).await.unwrap();
/// kv.put("greeting", &SecretEnvelope::new("hello")).await.unwrap();
/// assert!(kv.get("greeting").await.unwrap().is_some());
/// # });
/// ```
#[derive(Default)]
pub struct MemorySecretBackend {
    transit_keys: RwLock<HashMap<String, TransitKey>>,
    namespaces: RwLock<HashMap<String, NamespaceData>>,
    handles_created: AtomicUsize,
}

impl MemorySecretBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many key-value handles have been constructed.
    #[must_use]
    pub fn handles_created(&self) -> usize {
        self.handles_created.load(Ordering::SeqCst)
    }

    /// Returns `true` if a transit key exists at `path`.
    #[must_use]
    pub fn has_transit_key(&self, path: &str) -> bool {
        self.transit_keys.read().contains_key(path)
    }

    /// Stores a raw response at `key`, bypassing the envelope.
    ///
    /// Lets tests plant data in shapes the envelope would never produce.
    pub fn put_raw(&self, namespace: &str, key: &str, response: KeyValueResponse) {
        self.namespace(namespace).write().insert(key.to_owned(), response);
    }

    fn namespace(&self, namespace: &str) -> NamespaceData {
        if let Some(data) = self.namespaces.read().get(namespace) {
            return Arc::clone(data);
        }
        Arc::clone(self.namespaces.write().entry(namespace.to_owned()).or_default())
    }

    fn cipher_for_encrypt(&self, path: &str) -> XChaCha20Poly1305 {
        if let Some(key) = self.transit_keys.read().get(path) {
            return XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
        }

        let mut keys = self.transit_keys.write();
        let key = keys.entry(path.to_owned()).or_insert_with(|| {
            tracing::debug!(path, "generated transit key");
            let mut key = Zeroizing::new([0u8; KEY_SIZE]);
            OsRng.fill_bytes(key.as_mut_slice());
            key
        });
        XChaCha20Poly1305::new(Key::from_slice(key.as_slice()))
    }

    fn cipher_for_decrypt(&self, path: &str) -> VaultResult<XChaCha20Poly1305> {
        self.transit_keys
            .read()
            .get(path)
            .map(|key| XChaCha20Poly1305::new(Key::from_slice(key.as_slice())))
            .ok_or_else(|| VaultError::rejected("decrypt", format!("no transit key at '{path}'")))
    }
}

#[async_trait]
impl SecretBackend for MemorySecretBackend {
    async fn encrypt_transit(&self, path: &str, plaintext: &[u8]) -> VaultResult<String> {
        fail_point!("memory-backend-encrypt", |_| {
            Err(VaultError::transport("injected failure at memory-backend-encrypt"))
        });

        let cipher = self.cipher_for_encrypt(path);

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let sealed = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|e| VaultError::rejected("encrypt", format!("encryption failed: {e}")))?;

        let mut data = Vec::with_capacity(NONCE_SIZE + sealed.len());
        data.extend_from_slice(&nonce);
        data.extend_from_slice(&sealed);

        Ok(format!("{CIPHERTEXT_PREFIX}{}", STANDARD.encode(data)))
    }

    async fn decrypt_transit(&self, path: &str, ciphertext: &str) -> VaultResult<Vec<u8>> {
        fail_point!("memory-backend-decrypt", |_| {
            Err(VaultError::transport("injected failure at memory-backend-decrypt"))
        });

        let encoded = ciphertext.strip_prefix(CIPHERTEXT_PREFIX).ok_or_else(|| {
            VaultError::rejected("decrypt", format!("ciphertext must start with '{CIPHERTEXT_PREFIX}'"))
        })?;

        let data = STANDARD
            .decode(encoded)
            .map_err(|e| VaultError::rejected("decrypt", format!("invalid base64: {e}")))?;

        if data.len() < NONCE_SIZE {
            return Err(VaultError::rejected("decrypt", "ciphertext too short"));
        }

        let (nonce, sealed) = data.split_at(NONCE_SIZE);
        let cipher = self.cipher_for_decrypt(path)?;

        cipher
            .decrypt(XNonce::from_slice(nonce), sealed)
            .map_err(|_| VaultError::rejected("decrypt", "ciphertext failed authentication"))
    }

    async fn key_value_operations(
        &self,
        namespace: &str,
        engine: KeyValueEngine,
    ) -> VaultResult<Arc<dyn KeyValueOperations>> {
        fail_point!("memory-backend-kv-handle", |_| {
            Err(VaultError::transport("injected failure at memory-backend-kv-handle"))
        });

        self.handles_created.fetch_add(1, Ordering::SeqCst);

        Ok(Arc::new(MemoryKeyValueOperations {
            namespace: namespace.to_owned(),
            engine,
            data: self.namespace(namespace),
        }))
    }
}

/// Key-value handle for one namespace of a [`MemorySecretBackend`].
pub struct MemoryKeyValueOperations {
    namespace: String,
    engine: KeyValueEngine,
    data: NamespaceData,
}

impl MemoryKeyValueOperations {
    /// Returns the namespace this handle reads and writes.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the engine this handle was created for.
    #[must_use]
    pub fn engine(&self) -> KeyValueEngine {
        self.engine
    }
}

#[async_trait]
impl KeyValueOperations for MemoryKeyValueOperations {
    async fn put(&self, key: &str, envelope: &SecretEnvelope) -> VaultResult<()> {
        fail_point!("memory-kv-put", |_| {
            Err(VaultError::transport("injected failure at memory-kv-put"))
        });

        let response = KeyValueResponse::from_envelope(envelope).map_err(|e| {
            VaultError::serialization_with_source("failed to encode secret envelope", e)
        })?;
        self.data.write().insert(key.to_owned(), response);
        Ok(())
    }

    async fn get(&self, key: &str) -> VaultResult<Option<KeyValueResponse>> {
        fail_point!("memory-kv-get", |_| {
            Err(VaultError::transport("injected failure at memory-kv-get"))
        });

        Ok(self.data.read().get(key).cloned())
    }
}
