//! Secret service facade for TrustGate.
//!
//! This crate wraps an external secret/transit-encryption service behind a
//! small async API: encrypt and decrypt byte payloads with named transit keys,
//! and store or fetch string secrets in key-value namespaces.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │               VaultCommunicationService                  │
//! │  encrypt │ decrypt │ write_key_value_secret │ read_...   │
//! ├──────────────────────────────┬───────────────────────────┤
//! │                              │  KeyValueOperationsCache  │
//! │                              │  (one handle / namespace) │
//! ├──────────────────────────────┴───────────────────────────┤
//! │                     SecretBackend                        │
//! ├────────────────────┬─────────────────────────────────────┤
//! │ MemorySecretBackend│      HTTP client (out of tree)      │
//! └────────────────────┴─────────────────────────────────────┘
//! ```
//!
//! # Stored Secret Format
//!
//! Key-value secrets are stored as `{"value": <string-or-null>}`. See
//! [`SecretEnvelope`]. Reads distinguish an absent secret
//! ([`SecretLookup::NotFound`]) from one whose value is `null`
//! ([`SecretLookup::Found`] with `None`).
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use trustgate_vault::{MemorySecretBackend, VaultCommunicationService, VaultConfig};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let config = VaultConfig::builder().uri("http://127.0.0.1:8200").token("root").build()?;
//! let vault = VaultCommunicationService::new(config, Arc::new(MemorySecretBackend::new()))?;
//!
//! vault.write_key_value_secret("kv/payments", "stripe-key", "sk_live_123").await?;
//! let lookup = vault.read_key_value_secret("kv/payments", "stripe-key").await?;
//! assert_eq!(lookup.value(), Some("sk_live_123"));
//! # Ok::<(), trustgate_vault::VaultError>(())
//! # }).unwrap();
//! ```
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module with instrumented backends and the
//!   `assert_vault_error!` macro. Enable this in `[dev-dependencies]` for integration tests.
//! - **`failpoints`**: Activates `fail` injection sites in [`MemorySecretBackend`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod service;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
pub mod types;

pub use backend::{KeyValueOperations, SecretBackend};
pub use cache::KeyValueOperationsCache;
pub use config::VaultConfig;
pub use error::{BoxError, VaultError, VaultResult};
pub use memory::MemorySecretBackend;
pub use service::VaultCommunicationService;
pub use types::{KeyValueEngine, KeyValueResponse, SecretEnvelope, SecretLookup};
