//! Per-namespace cache of key-value handles.
//!
//! The facade asks the backend for a [`KeyValueOperations`] handle the first
//! time a namespace is used and keeps it for the facade's lifetime.
//!
//! # Cache Strategy
//!
//! - **Construction**: single-flight. Concurrent first use of one namespace runs exactly one
//!   backend construction; every racer receives the same `Arc`.
//! - **Failures**: a failed construction is not cached. Every caller waiting on it receives the
//!   error, and the next call tries again.
//! - **Eviction**: none. Handles live until the cache is dropped. The number of entries is
//!   bounded by the number of distinct namespaces the service is configured to touch.

use std::sync::Arc;

use moka::future::Cache;

use crate::{
    backend::{KeyValueOperations, SecretBackend},
    error::{VaultError, VaultResult},
    types::KeyValueEngine,
};

/// Lazily populated map from namespace to key-value handle.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use trustgate_vault::{KeyValueEngine, KeyValueOperationsCache, MemorySecretBackend};
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let cache = KeyValueOperationsCache::new(Arc::new(MemorySecretBackend::new()), KeyValueEngine::V1);
///
/// let first = cache.get_or_create("kv/app").await.unwrap();
/// let second = cache.get_or_create("kv/app").await.unwrap();
/// assert!(Arc::ptr_eq(&first, &second));
/// # });
/// ```
pub struct KeyValueOperationsCache {
    backend: Arc<dyn SecretBackend>,
    engine: KeyValueEngine,
    handles: Cache<String, Arc<dyn KeyValueOperations>>,
}

impl KeyValueOperationsCache {
    /// Creates an empty cache that builds handles for `engine` from `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn SecretBackend>, engine: KeyValueEngine) -> Self {
        Self { backend, engine, handles: Cache::builder().name("kv-operations").build() }
    }

    /// Returns the handle for `namespace`, constructing it on first use.
    ///
    /// # Errors
    ///
    /// Returns the backend's error if the handle could not be constructed.
    /// Nothing is cached in that case.
    pub async fn get_or_create(&self, namespace: &str) -> VaultResult<Arc<dyn KeyValueOperations>> {
        let backend = Arc::clone(&self.backend);
        let engine = self.engine;
        let owned_namespace = namespace.to_owned();

        self.handles
            .try_get_with(namespace.to_owned(), async move {
                let handle = backend.key_value_operations(&owned_namespace, engine).await?;
                tracing::debug!(namespace = %owned_namespace, %engine, "created key-value handle");
                Ok::<_, VaultError>(handle)
            })
            .await
            .map_err(|err| {
                tracing::warn!(namespace, error = %err, "failed to create key-value handle");
                Arc::unwrap_or_clone(err)
            })
    }

    /// Returns `true` if a handle for `namespace` has been constructed.
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.handles.contains_key(namespace)
    }

    /// Returns the number of cached handles.
    pub async fn len(&self) -> u64 {
        self.handles.run_pending_tasks().await;
        self.handles.entry_count()
    }

    /// Returns `true` if no handle has been constructed yet.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns the key-value engine handles are built for.
    #[must_use]
    pub fn engine(&self) -> KeyValueEngine {
        self.engine
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use tokio::task::JoinSet;

    use super::*;
    use crate::{
        memory::MemorySecretBackend,
        testutil::{CountingBackend, FailingBackend},
    };

    #[tokio::test]
    async fn test_same_namespace_returns_identical_handle() {
        let cache =
            KeyValueOperationsCache::new(Arc::new(MemorySecretBackend::new()), KeyValueEngine::V1);

        let first = cache.get_or_create("kv/app").await.unwrap();
        let second = cache.get_or_create("kv/app").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_distinct_namespaces_return_distinct_handles() {
        let cache =
            KeyValueOperationsCache::new(Arc::new(MemorySecretBackend::new()), KeyValueEngine::V1);

        let app = cache.get_or_create("kv/app").await.unwrap();
        let ops = cache.get_or_create("kv/ops").await.unwrap();

        assert!(!Arc::ptr_eq(&app, &ops));
        assert!(cache.contains("kv/app"));
        assert!(cache.contains("kv/ops"));
        assert!(!cache.contains("kv/other"));
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_constructs_once() {
        let backend = Arc::new(CountingBackend::with_delay(Duration::from_millis(20)));
        let cache = Arc::new(KeyValueOperationsCache::new(backend.clone(), KeyValueEngine::V1));

        let mut set = JoinSet::new();
        for _ in 0..32 {
            let cache = Arc::clone(&cache);
            set.spawn(async move { cache.get_or_create("kv/contended").await.unwrap() });
        }

        let mut handles = Vec::new();
        while let Some(result) = set.join_next().await {
            handles.push(result.expect("task should not panic"));
        }

        assert_eq!(backend.constructions("kv/contended"), 1);
        let first = &handles[0];
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, first)));
    }

    #[tokio::test]
    async fn test_failed_construction_is_not_cached() {
        let backend = Arc::new(FailingBackend::new(1));
        let cache = KeyValueOperationsCache::new(backend.clone(), KeyValueEngine::V1);

        let err = cache.get_or_create("kv/flaky").await.err().expect("first call fails");
        assert!(err.is_transport());
        assert!(!cache.contains("kv/flaky"));

        cache.get_or_create("kv/flaky").await.expect("second call succeeds");
        assert!(cache.contains("kv/flaky"));
        assert_eq!(backend.attempts(), 2);
    }

    #[tokio::test]
    async fn test_handles_use_configured_engine() {
        let backend = Arc::new(CountingBackend::new());
        let cache = KeyValueOperationsCache::new(backend.clone(), KeyValueEngine::V2);

        cache.get_or_create("kv/versioned").await.unwrap();

        assert_eq!(cache.engine(), KeyValueEngine::V2);
        assert_eq!(backend.last_engine(), Some(KeyValueEngine::V2));
    }

    #[tokio::test]
    async fn test_new_cache_is_empty() {
        let cache =
            KeyValueOperationsCache::new(Arc::new(MemorySecretBackend::new()), KeyValueEngine::V1);
        assert!(cache.is_empty().await);
    }
}
