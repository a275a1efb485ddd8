//! # TrustGate Authentication
//!
//! Bearer token issuance and verification for TrustGate services.
//!
//! This crate provides:
//! - **Issuance**: [`BearerTokenIssuer`] turns an authenticated identity into a signed compact JWS
//! - **Signer selection**: [`SignerProvider`] picks a key valid through the token expiration;
//!   [`RotatingSignerProvider`] is an in-memory implementation with rotation and revocation
//! - **Verification**: decoding and signature checks in [`jwt`]
//! - **Algorithm validation**: symmetric algorithms and `none` are always rejected
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use trustgate_authn::{
//!     AuthenticationToken, BearerTokenIssuer, RotatingSignerProvider,
//!     jwt::verify_with_signer_provider,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let provider = Arc::new(RotatingSignerProvider::new());
//! provider.rotate(Duration::hours(12)).unwrap();
//!
//! let issuer = BearerTokenIssuer::new(provider.clone());
//! let identity = AuthenticationToken::new(
//!     "alice@example.com",
//!     "https://login.example.com",
//!     Utc::now() + Duration::hours(1),
//! );
//! let token = issuer.get_bearer_token(&identity).await.unwrap();
//!
//! let claims = verify_with_signer_provider(&token, &provider, None).unwrap();
//! assert_eq!(claims.sub, "alice@example.com");
//! assert_eq!(claims.iss, "https%3A%2F%2Flogin.example.com");
//! # });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Time source.
pub mod clock;
/// Authentication error types.
pub mod error;
/// Identity input to issuance.
pub mod identity;
/// Bearer token issuance.
pub mod issuer;
/// Bearer token claims and verification.
pub mod jwt;
/// Signer selection and rotation.
pub mod provider;
/// JWS signing capabilities.
pub mod signer;
#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
/// Algorithm and key identifier validation.
pub mod validation;

// Re-export key types for convenience
pub use clock::{Clock, SystemClock};
pub use error::{AuthError, BoxError, Result};
pub use identity::AuthenticationToken;
pub use issuer::{BearerTokenIssuer, url_encode};
pub use jwt::BearerClaims;
pub use provider::{RotatingSignerProvider, SignerProvider, SigningKeyEntry};
pub use signer::{Ed25519Signer, JwsSigner, SignerHandle};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm, validate_kid};
