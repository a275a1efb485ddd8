//! JWS algorithm and key identifier validation.
//!
//! The issuer checks the algorithm of every resolved signer before signing,
//! and the verification helpers check the header of every token before any
//! key lookup.
//!
//! # Security
//!
//! - Only asymmetric algorithms are accepted
//! - Symmetric algorithms and `none` are always rejected, ahead of the allow-list check
//! - Key identifiers are length-bounded and restricted to a URL-safe alphabet

use crate::error::AuthError;

/// Algorithms that are never accepted.
///
/// - `none`: no signature at all
/// - `HS256`, `HS384`, `HS512`: symmetric; anyone able to verify could also sign
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Asymmetric algorithms accepted for signing and verification.
///
/// Signers built into this crate produce `EdDSA` only. The remaining entries
/// allow external [`JwsSigner`](crate::JwsSigner) implementations (HSM or KMS
/// backed RSA/ECDSA keys) to plug into the issuer. Verification through
/// [`verify_with_signer_provider`](crate::jwt::verify_with_signer_provider)
/// additionally requires `EdDSA`.
pub const ACCEPTED_ALGORITHMS: &[&str] =
    &["EdDSA", "ES256", "ES384", "RS256", "RS384", "RS512", "PS256", "PS384", "PS512"];

/// Maximum length of a key identifier.
pub const MAX_KID_LENGTH: usize = 128;

/// Validates a JWS algorithm name against the security policy.
///
/// # Errors
///
/// Returns [`AuthError::UnsupportedAlgorithm`] if the algorithm is in
/// [`FORBIDDEN_ALGORITHMS`] or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use trustgate_authn::validation::validate_algorithm;
///
/// assert!(validate_algorithm("EdDSA").is_ok());
/// assert!(validate_algorithm("HS256").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), AuthError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not in accepted list"
        )));
    }

    Ok(())
}

/// Validates a key identifier taken from configuration or a token header.
///
/// Accepts 1 to [`MAX_KID_LENGTH`] characters from `[A-Za-z0-9._:-]`.
///
/// # Errors
///
/// Returns [`AuthError::InvalidTokenFormat`] if the identifier is empty, too
/// long or contains other characters.
pub fn validate_kid(kid: &str) -> Result<(), AuthError> {
    if kid.is_empty() {
        return Err(AuthError::invalid_token_format("kid cannot be empty"));
    }

    if kid.len() > MAX_KID_LENGTH {
        return Err(AuthError::invalid_token_format(format!(
            "kid exceeds {MAX_KID_LENGTH} characters"
        )));
    }

    if let Some(bad) =
        kid.chars().find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '-')))
    {
        return Err(AuthError::invalid_token_format(format!(
            "kid contains invalid character {bad:?}"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_algorithm_asymmetric_accepted() {
        for alg in ACCEPTED_ALGORITHMS {
            assert!(validate_algorithm(alg).is_ok(), "{alg} should be accepted");
        }
    }

    #[test]
    fn test_forbidden_algorithms_each_rejected_with_security_message() {
        for alg in FORBIDDEN_ALGORITHMS {
            let result = validate_algorithm(alg);
            assert!(
                matches!(result, Err(AuthError::UnsupportedAlgorithm(ref msg)) if msg.contains("not allowed for security reasons")),
                "Expected security rejection for forbidden algorithm '{alg}'"
            );
        }
    }

    #[test]
    fn test_validate_algorithm_unknown_rejected() {
        let result = validate_algorithm("ES512K");
        assert!(
            matches!(result, Err(AuthError::UnsupportedAlgorithm(ref msg)) if msg.contains("not in accepted list"))
        );
    }

    #[test]
    fn test_validate_algorithm_is_case_sensitive() {
        assert!(validate_algorithm("eddsa").is_err());
        assert!(validate_algorithm("NONE").is_err());
    }

    #[test]
    fn test_validate_kid_accepts_uuid_and_dotted_ids() {
        assert!(validate_kid("4f1c2a9e-7d3b-4e2f-9a1b-0c8d7e6f5a4b").is_ok());
        assert!(validate_kid("signer.2024:primary_1").is_ok());
    }

    #[test]
    fn test_validate_kid_rejects_empty() {
        assert!(matches!(validate_kid(""), Err(AuthError::InvalidTokenFormat(_))));
    }

    #[test]
    fn test_validate_kid_rejects_path_and_control_characters() {
        for kid in ["../../etc/passwd", "kid with space", "kid\n", "kid%00", "kïd"] {
            assert!(validate_kid(kid).is_err(), "{kid:?} should be rejected");
        }
    }

    #[test]
    fn test_validate_kid_length_boundary() {
        assert!(validate_kid(&"a".repeat(MAX_KID_LENGTH)).is_ok());
        assert!(validate_kid(&"a".repeat(MAX_KID_LENGTH + 1)).is_err());
    }
}
