//! JWS signing capabilities.
//!
//! A [`JwsSigner`] turns a signing input (`b64(header).b64(payload)`) into
//! raw signature bytes. A [`SignerHandle`] pairs a signer with the key
//! identifier and algorithm that go into the token header; providers hand
//! out one per issuance.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use jsonwebtoken::{Algorithm, DecodingKey};
use rand_core::OsRng;
use zeroize::Zeroizing;

use crate::error::{AuthError, BoxError};

/// Produces JWS signatures with one private key.
///
/// Implementations may wrap in-process keys or remote signing services.
/// Signing is synchronous; a remote implementation should resolve its key
/// material inside [`SignerProvider::select_signer`](crate::SignerProvider::select_signer).
pub trait JwsSigner: Send + Sync {
    /// Returns the JWS algorithm this signer produces.
    fn algorithm(&self) -> Algorithm;

    /// Signs `signing_input`, returning the raw signature bytes.
    ///
    /// # Errors
    ///
    /// Returns the underlying failure; the issuer wraps it in
    /// [`AuthError::Signing`].
    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, BoxError>;
}

/// In-process Ed25519 signer (`EdDSA`).
///
/// The private key is zeroized on drop.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Generates a signer with a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        Self { key: SigningKey::generate(&mut OsRng) }
    }

    /// Creates a signer from a 32-byte Ed25519 secret key.
    #[must_use]
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self { key: SigningKey::from_bytes(secret) }
    }

    /// Returns the secret key bytes, zeroized on drop.
    #[must_use]
    pub fn secret_bytes(&self) -> Zeroizing<[u8; 32]> {
        Zeroizing::new(self.key.to_bytes())
    }

    /// Returns the Ed25519 public key.
    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    /// Returns the public key as base64url without padding (the JWK `x` value).
    #[must_use]
    pub fn public_key_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.key.verifying_key().to_bytes())
    }

    /// Builds the verification key for tokens this signer produces.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidPublicKey`] if the key cannot be encoded.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthError> {
        DecodingKey::from_ed_components(&self.public_key_base64url())
            .map_err(|e| AuthError::invalid_public_key(e.to_string()))
    }
}

impl JwsSigner for Ed25519Signer {
    fn algorithm(&self) -> Algorithm {
        Algorithm::EdDSA
    }

    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(self.key.sign(signing_input).to_bytes().to_vec())
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key_base64url())
            .finish_non_exhaustive()
    }
}

/// A signer resolved for one issuance.
#[derive(Clone)]
pub struct SignerHandle {
    key_identifier: String,
    algorithm: Algorithm,
    signer: Arc<dyn JwsSigner>,
}

impl SignerHandle {
    /// Pairs `signer` with the header values it signs under.
    pub fn new(
        key_identifier: impl Into<String>,
        algorithm: Algorithm,
        signer: Arc<dyn JwsSigner>,
    ) -> Self {
        Self { key_identifier: key_identifier.into(), algorithm, signer }
    }

    /// Returns the `kid` written into the token header.
    #[must_use]
    pub fn key_identifier(&self) -> &str {
        &self.key_identifier
    }

    /// Returns the `alg` written into the token header.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Returns the signing capability.
    #[must_use]
    pub fn signer(&self) -> &Arc<dyn JwsSigner> {
        &self.signer
    }
}

impl std::fmt::Debug for SignerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerHandle")
            .field("key_identifier", &self.key_identifier)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use ed25519_dalek::{Signature, Verifier};

    use super::*;

    #[test]
    fn test_ed25519_signature_verifies() {
        let signer = Ed25519Signer::generate();

        let signature = signer.sign(b"header.payload").unwrap();
        let signature = Signature::from_slice(&signature).unwrap();

        assert!(signer.verifying_key().verify(b"header.payload", &signature).is_ok());
        assert!(signer.verifying_key().verify(b"header.other", &signature).is_err());
    }

    #[test]
    fn test_ed25519_from_secret_bytes_is_deterministic() {
        let original = Ed25519Signer::generate();
        let restored = Ed25519Signer::from_secret_bytes(&original.secret_bytes());

        assert_eq!(original.public_key_base64url(), restored.public_key_base64url());
        assert_eq!(original.sign(b"m").unwrap(), restored.sign(b"m").unwrap());
    }

    #[test]
    fn test_public_key_is_unpadded_base64url() {
        let signer = Ed25519Signer::generate();
        let encoded = signer.public_key_base64url();

        assert_eq!(encoded.len(), 43);
        assert!(!encoded.contains('='));
        assert_eq!(URL_SAFE_NO_PAD.decode(&encoded).unwrap().len(), 32);
    }

    #[test]
    fn test_debug_output_hides_private_key() {
        let signer = Ed25519Signer::generate();
        let secret = URL_SAFE_NO_PAD.encode(*signer.secret_bytes());

        let debug = format!("{signer:?}");
        assert!(!debug.contains(&secret));
        assert!(debug.contains(&signer.public_key_base64url()));
    }

    #[test]
    fn test_handle_exposes_header_values() {
        let handle = SignerHandle::new("kid-1", Algorithm::EdDSA, Arc::new(Ed25519Signer::generate()));

        assert_eq!(handle.key_identifier(), "kid-1");
        assert_eq!(handle.algorithm(), Algorithm::EdDSA);
        assert_eq!(handle.signer().algorithm(), Algorithm::EdDSA);
        assert!(format!("{handle:?}").contains("kid-1"));
    }
}
