//! Shared test utilities for authentication testing.
//!
//! This module provides a controllable clock, scripted signer providers and
//! signers, a raw JWT builder for attack tests and an assertion macro. It is
//! feature-gated behind `testutil` to prevent leaking into production builds.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! trustgate-authn = { path = "../authn", features = ["testutil"] }
//! ```
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use trustgate_authn::testutil::{ManualClock, StaticSignerProvider, craft_raw_jwt};
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::Algorithm;
use parking_lot::Mutex;

use crate::{
    clock::Clock,
    error::{AuthError, BoxError, Result},
    provider::SignerProvider,
    signer::{Ed25519Signer, JwsSigner, SignerHandle},
};

/// [`Clock`] that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Creates a clock frozen at `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Sets the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl Default for ManualClock {
    /// Freezes the clock at the current wall-clock time.
    fn default() -> Self {
        Self::at(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// [`SignerProvider`] that always returns the same handle and records calls.
pub struct StaticSignerProvider {
    handle: SignerHandle,
    calls: AtomicUsize,
    last_expiration: Mutex<Option<DateTime<Utc>>>,
}

impl StaticSignerProvider {
    /// Creates a provider returning `handle`.
    #[must_use]
    pub fn new(handle: SignerHandle) -> Self {
        Self { handle, calls: AtomicUsize::new(0), last_expiration: Mutex::new(None) }
    }

    /// Creates a provider backed by a fresh Ed25519 key under `kid`.
    #[must_use]
    pub fn ed25519(kid: &str) -> Self {
        Self::new(SignerHandle::new(kid, Algorithm::EdDSA, Arc::new(Ed25519Signer::generate())))
    }

    /// Returns how many times a signer was requested.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the expiration passed to the most recent request.
    #[must_use]
    pub fn last_expiration(&self) -> Option<DateTime<Utc>> {
        *self.last_expiration.lock()
    }
}

#[async_trait]
impl SignerProvider for StaticSignerProvider {
    async fn select_signer(&self, expiration: DateTime<Utc>) -> Result<SignerHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_expiration.lock() = Some(expiration);
        Ok(self.handle.clone())
    }
}

/// [`SignerProvider`] that always fails with a clone of one error.
pub struct FailingSignerProvider {
    error: AuthError,
    calls: AtomicUsize,
}

impl FailingSignerProvider {
    /// Creates a provider failing with `error`.
    #[must_use]
    pub fn new(error: AuthError) -> Self {
        Self { error, calls: AtomicUsize::new(0) }
    }

    /// Returns how many times a signer was requested.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SignerProvider for FailingSignerProvider {
    async fn select_signer(&self, _expiration: DateTime<Utc>) -> Result<SignerHandle> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// [`JwsSigner`] whose every signature attempt fails.
#[derive(Debug)]
pub struct FailingSigner {
    algorithm: Algorithm,
}

impl FailingSigner {
    /// Creates a signer claiming `algorithm`.
    #[must_use]
    pub fn new(algorithm: Algorithm) -> Self {
        Self { algorithm }
    }
}

impl JwsSigner for FailingSigner {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn sign(&self, _signing_input: &[u8]) -> std::result::Result<Vec<u8>, BoxError> {
        Err(Arc::new(std::io::Error::other("signing device unavailable")))
    }
}

/// Creates a raw JWT string from arbitrary header and payload JSON.
///
/// The result is `{header_b64}.{payload_b64}.` with an empty signature,
/// for testing rejection of malformed or forged tokens.
///
/// # Panics
///
/// Panics if JSON serialization fails.
#[allow(clippy::expect_used)]
pub fn craft_raw_jwt(header_json: &serde_json::Value, payload_json: &serde_json::Value) -> String {
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(header_json).expect("header json"));
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload_json).expect("payload json"));
    format!("{header_b64}.{payload_b64}.")
}

/// Asserts that a [`Result<T, AuthError>`] is an `Err` matching the given
/// [`AuthError`] variant.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use trustgate_authn::{assert_auth_error, error::AuthError};
///
/// let result: Result<(), AuthError> = Err(AuthError::token_expired());
/// assert_auth_error!(result, TokenExpired);
/// ```
#[macro_export]
macro_rules! assert_auth_error {
    ($result:expr, $variant:ident) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "expected AuthError::{}, got: {:?}",
            stringify!($variant),
            $result,
        );
    };
    ($result:expr, $variant:ident, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::AuthError::$variant { .. })),
            "{}: expected AuthError::{}, got: {:?}",
            $msg,
            stringify!($variant),
            $result,
        );
    };
}
