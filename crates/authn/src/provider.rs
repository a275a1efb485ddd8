//! Signer selection.
//!
//! [`SignerProvider`] resolves which key signs a token, given the token's
//! expiration. [`RotatingSignerProvider`] is the in-memory implementation:
//! it holds a set of Ed25519 keys with validity windows, rotates new keys in
//! on demand and serves the matching verification keys by `kid`.
//!
//! # Selection Rules
//!
//! A key is eligible for an expiration `exp` at instant `now` when it is not
//! revoked, `valid_from <= now` and `valid_until >= exp`. Among eligible keys
//! the most recently activated one wins. A key that would expire before the
//! token does is never returned.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use fail::fail_point;
use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    error::{AuthError, Result},
    signer::{Ed25519Signer, JwsSigner, SignerHandle},
    validation::validate_kid,
};

/// Resolves the signer for a token expiring at a given instant.
#[async_trait]
pub trait SignerProvider: Send + Sync {
    /// Returns a signer whose key is valid through `expiration`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NoEligibleSigner`] if no key covers `expiration`
    /// - [`AuthError::KeyProvider`] if the key source could not be reached
    async fn select_signer(&self, expiration: DateTime<Utc>) -> Result<SignerHandle>;
}

/// A signing key with its validity window.
#[derive(Clone, Debug)]
pub struct SigningKeyEntry {
    /// Key identifier written into token headers.
    pub kid: String,
    /// The private key.
    pub signer: Arc<Ed25519Signer>,
    /// Instant from which the key may sign.
    pub valid_from: DateTime<Utc>,
    /// Last instant a token signed by this key may expire at.
    pub valid_until: DateTime<Utc>,
}

impl SigningKeyEntry {
    /// Creates an entry for `signer` valid over `[valid_from, valid_until]`.
    pub fn new(
        kid: impl Into<String>,
        signer: Arc<Ed25519Signer>,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> Self {
        Self { kid: kid.into(), signer, valid_from, valid_until }
    }
}

#[derive(Debug)]
struct StoredKey {
    entry: SigningKeyEntry,
    activation: u64,
    revoked_at: Option<DateTime<Utc>>,
}

impl StoredKey {
    fn covers(&self, now: DateTime<Utc>, expiration: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.entry.valid_from <= now && self.entry.valid_until >= expiration
    }
}

#[derive(Default)]
struct KeyRing {
    keys: Vec<StoredKey>,
    next_activation: u64,
}

/// In-memory [`SignerProvider`] with key rotation.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use trustgate_authn::{RotatingSignerProvider, SignerProvider};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let provider = RotatingSignerProvider::new();
/// let kid = provider.rotate(Duration::hours(12)).unwrap();
///
/// let handle = provider.select_signer(Utc::now() + Duration::hours(1)).await.unwrap();
/// assert_eq!(handle.key_identifier(), kid);
/// # });
/// ```
pub struct RotatingSignerProvider {
    ring: RwLock<KeyRing>,
    clock: Arc<dyn Clock>,
}

impl RotatingSignerProvider {
    /// Creates an empty provider using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty provider using `clock` for validity checks.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { ring: RwLock::new(KeyRing::default()), clock }
    }

    /// Generates a fresh Ed25519 key valid from now for `validity` and makes
    /// it the preferred signer.
    ///
    /// Returns the new key identifier (a random UUID).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Precondition`] if `validity` is not positive or
    /// ends beyond the representable calendar.
    pub fn rotate(&self, validity: Duration) -> Result<String> {
        if validity <= Duration::zero() {
            return Err(AuthError::precondition("key validity must be positive"));
        }

        let now = self.clock.now();
        let valid_until = now
            .checked_add_signed(validity)
            .ok_or_else(|| AuthError::precondition("key validity overflows the calendar"))?;
        let kid = Uuid::new_v4().to_string();
        let entry =
            SigningKeyEntry::new(&kid, Arc::new(Ed25519Signer::generate()), now, valid_until);
        self.insert_key(entry)?;

        tracing::info!(kid = %kid, valid_until = %valid_until, "rotated signing key");
        Ok(kid)
    }

    /// Adds an existing key. Later insertions are preferred over earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Precondition`] if the `kid` is invalid or already
    /// registered, or if the validity window is empty.
    pub fn insert_key(&self, entry: SigningKeyEntry) -> Result<()> {
        validate_kid(&entry.kid)
            .map_err(|e| AuthError::precondition(format!("invalid key identifier: {e}")))?;

        if entry.valid_until <= entry.valid_from {
            return Err(AuthError::precondition(format!(
                "key '{}' has an empty validity window",
                entry.kid
            )));
        }

        let mut ring = self.ring.write();
        if ring.keys.iter().any(|k| k.entry.kid == entry.kid) {
            return Err(AuthError::precondition(format!("key '{}' is already registered", entry.kid)));
        }

        let activation = ring.next_activation;
        ring.next_activation += 1;
        tracing::debug!(kid = %entry.kid, activation, "registered signing key");
        ring.keys.push(StoredKey { entry, activation, revoked_at: None });
        Ok(())
    }

    /// Revokes a key. It is never selected again and its verification key is
    /// no longer served.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::KeyNotFound`] if no key has this identifier.
    pub fn revoke(&self, kid: &str) -> Result<()> {
        let now = self.clock.now();
        let mut ring = self.ring.write();
        let key = ring
            .keys
            .iter_mut()
            .find(|k| k.entry.kid == kid)
            .ok_or_else(|| AuthError::key_not_found(kid))?;

        if key.revoked_at.is_none() {
            key.revoked_at = Some(now);
            tracing::warn!(kid, "revoked signing key");
        }
        Ok(())
    }

    /// Removes keys whose validity ended before `now`. Returns how many were
    /// removed.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let mut ring = self.ring.write();
        let before = ring.keys.len();
        ring.keys.retain(|k| k.entry.valid_until >= now);
        let removed = before - ring.keys.len();

        if removed > 0 {
            tracing::debug!(removed, "pruned expired signing keys");
        }
        removed
    }

    /// Returns the verification key for `kid`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::KeyNotFound`] if no key has this identifier
    /// - [`AuthError::KeyRevoked`] if the key was revoked
    pub fn decoding_key(&self, kid: &str) -> Result<DecodingKey> {
        let signer = {
            let ring = self.ring.read();
            let key = ring
                .keys
                .iter()
                .find(|k| k.entry.kid == kid)
                .ok_or_else(|| AuthError::key_not_found(kid))?;

            if key.revoked_at.is_some() {
                return Err(AuthError::key_revoked(kid));
            }
            Arc::clone(&key.entry.signer)
        };

        signer.decoding_key()
    }

    /// Returns the identifiers of keys that are neither revoked nor past
    /// their validity, oldest first.
    #[must_use]
    pub fn active_kids(&self) -> Vec<String> {
        let now = self.clock.now();
        let ring = self.ring.read();
        let mut keys: Vec<_> = ring
            .keys
            .iter()
            .filter(|k| k.revoked_at.is_none() && k.entry.valid_until >= now)
            .collect();
        keys.sort_by_key(|k| k.activation);
        keys.into_iter().map(|k| k.entry.kid.clone()).collect()
    }

    /// Returns the number of registered keys, revoked ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.read().keys.len()
    }

    /// Returns `true` if no keys are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.read().keys.is_empty()
    }
}

impl Default for RotatingSignerProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignerProvider for RotatingSignerProvider {
    async fn select_signer(&self, expiration: DateTime<Utc>) -> Result<SignerHandle> {
        fail_point!("provider-select-signer", |_| {
            Err(AuthError::key_provider("injected failure at provider-select-signer"))
        });

        let now = self.clock.now();
        let selected = {
            let ring = self.ring.read();
            ring.keys
                .iter()
                .filter(|k| k.covers(now, expiration))
                .max_by_key(|k| k.activation)
                .map(|k| (k.entry.kid.clone(), Arc::clone(&k.entry.signer)))
        };

        match selected {
            Some((kid, signer)) => {
                let signer: Arc<dyn JwsSigner> = signer;
                Ok(SignerHandle::new(kid, Algorithm::EdDSA, signer))
            },
            None => {
                tracing::warn!(%expiration, "no signing key covers token expiration");
                Err(AuthError::no_eligible_signer(expiration))
            },
        }
    }
}
