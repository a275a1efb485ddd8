//! Shared test utilities for vault testing.
//!
//! Instrumented backends for exercising the handle cache and the envelope
//! checks, plus an assertion macro for [`VaultResult`](crate::VaultResult)
//! values. Feature-gated behind `testutil` to keep it out of production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! trustgate-vault = { path = "../vault", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use trustgate_vault::testutil::{CountingBackend, ScriptedBackend, test_config};
//! ```

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    backend::{KeyValueOperations, SecretBackend},
    config::VaultConfig,
    error::{VaultError, VaultResult},
    memory::MemorySecretBackend,
    types::{KeyValueEngine, KeyValueResponse, SecretEnvelope},
};

/// Returns a valid configuration pointing at a local dev server.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_config() -> VaultConfig {
    VaultConfig::builder()
        .uri("http://127.0.0.1:8200")
        .token("test-root-token")
        .build()
        .expect("static test config is valid")
}

/// [`MemorySecretBackend`] wrapper that counts handle constructions per
/// namespace, optionally slowing each construction down to widen races.
#[derive(Default)]
pub struct CountingBackend {
    inner: MemorySecretBackend,
    delay: Option<Duration>,
    constructions: Mutex<HashMap<String, usize>>,
    last_engine: Mutex<Option<KeyValueEngine>>,
}

impl CountingBackend {
    /// Creates a backend with no construction delay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that sleeps for `delay` inside every construction.
    #[must_use]
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    /// Returns how many handles were constructed for `namespace`.
    #[must_use]
    pub fn constructions(&self, namespace: &str) -> usize {
        self.constructions.lock().get(namespace).copied().unwrap_or(0)
    }

    /// Returns the total number of handle constructions.
    #[must_use]
    pub fn total_constructions(&self) -> usize {
        self.constructions.lock().values().sum()
    }

    /// Returns the engine passed to the most recent construction.
    #[must_use]
    pub fn last_engine(&self) -> Option<KeyValueEngine> {
        *self.last_engine.lock()
    }
}

#[async_trait]
impl SecretBackend for CountingBackend {
    async fn encrypt_transit(&self, path: &str, plaintext: &[u8]) -> VaultResult<String> {
        self.inner.encrypt_transit(path, plaintext).await
    }

    async fn decrypt_transit(&self, path: &str, ciphertext: &str) -> VaultResult<Vec<u8>> {
        self.inner.decrypt_transit(path, ciphertext).await
    }

    async fn key_value_operations(
        &self,
        namespace: &str,
        engine: KeyValueEngine,
    ) -> VaultResult<Arc<dyn KeyValueOperations>> {
        *self.constructions.lock().entry(namespace.to_owned()).or_insert(0) += 1;
        *self.last_engine.lock() = Some(engine);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.inner.key_value_operations(namespace, engine).await
    }
}

/// Backend whose first `failures` handle constructions fail with a transport
/// error. Transit operations always fail the same way.
pub struct FailingBackend {
    inner: MemorySecretBackend,
    failures: usize,
    attempts: AtomicUsize,
}

impl FailingBackend {
    /// Creates a backend that fails the first `failures` constructions.
    #[must_use]
    pub fn new(failures: usize) -> Self {
        Self { inner: MemorySecretBackend::new(), failures, attempts: AtomicUsize::new(0) }
    }

    /// Returns how many constructions have been attempted.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SecretBackend for FailingBackend {
    async fn encrypt_transit(&self, _path: &str, _plaintext: &[u8]) -> VaultResult<String> {
        Err(VaultError::transport("connection refused"))
    }

    async fn decrypt_transit(&self, _path: &str, _ciphertext: &str) -> VaultResult<Vec<u8>> {
        Err(VaultError::transport("connection refused"))
    }

    async fn key_value_operations(
        &self,
        namespace: &str,
        engine: KeyValueEngine,
    ) -> VaultResult<Arc<dyn KeyValueOperations>> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(VaultError::transport(format!(
                "connection refused while opening '{namespace}'"
            )));
        }
        self.inner.key_value_operations(namespace, engine).await
    }
}

/// Backend whose handles answer every read with one canned response.
///
/// Used to feed the facade responses a well-behaved backend never produces.
pub struct ScriptedBackend {
    response: Option<KeyValueResponse>,
    puts: Arc<Mutex<Vec<(String, SecretEnvelope)>>>,
}

impl ScriptedBackend {
    /// Creates a backend whose reads return `response`.
    #[must_use]
    pub fn new(response: Option<KeyValueResponse>) -> Self {
        Self { response, puts: Arc::new(Mutex::new(Vec::new())) }
    }

    /// Returns every `(key, envelope)` written through this backend's handles.
    #[must_use]
    pub fn puts(&self) -> Vec<(String, SecretEnvelope)> {
        self.puts.lock().clone()
    }
}

#[async_trait]
impl SecretBackend for ScriptedBackend {
    async fn encrypt_transit(&self, _path: &str, plaintext: &[u8]) -> VaultResult<String> {
        Ok(format!("scripted:{}", plaintext.len()))
    }

    async fn decrypt_transit(&self, _path: &str, _ciphertext: &str) -> VaultResult<Vec<u8>> {
        Err(VaultError::rejected("decrypt", "scripted backend cannot decrypt"))
    }

    async fn key_value_operations(
        &self,
        _namespace: &str,
        _engine: KeyValueEngine,
    ) -> VaultResult<Arc<dyn KeyValueOperations>> {
        Ok(Arc::new(ScriptedKeyValueOperations {
            response: self.response.clone(),
            puts: Arc::clone(&self.puts),
        }))
    }
}

/// Handle returned by [`ScriptedBackend`].
pub struct ScriptedKeyValueOperations {
    response: Option<KeyValueResponse>,
    puts: Arc<Mutex<Vec<(String, SecretEnvelope)>>>,
}

#[async_trait]
impl KeyValueOperations for ScriptedKeyValueOperations {
    async fn put(&self, key: &str, envelope: &SecretEnvelope) -> VaultResult<()> {
        self.puts.lock().push((key.to_owned(), envelope.clone()));
        Ok(())
    }

    async fn get(&self, _key: &str) -> VaultResult<Option<KeyValueResponse>> {
        Ok(self.response.clone())
    }
}

/// Assert that a [`VaultResult`](crate::VaultResult) is a specific
/// [`VaultError`](crate::VaultError) variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use trustgate_vault::{VaultError, VaultResult, assert_vault_error};
///
/// let result: VaultResult<()> = Err(VaultError::timeout());
/// assert_vault_error!(result, Timeout);
/// ```
#[macro_export]
macro_rules! assert_vault_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::VaultError::$variant { .. })),
            "expected VaultError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::VaultError::$variant { .. })),
            "{}: expected VaultError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
