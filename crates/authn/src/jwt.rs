//! Bearer token claims and verification.
//!
//! Tokens are compact JWS strings: three base64url segments without padding,
//! joined by `.`. This module decodes them and verifies them against the
//! keys of a [`RotatingSignerProvider`].
//!
//! # Example
//!
//! ```no_run
//! // Requires a token issued by the provider's keys.
//! use trustgate_authn::{RotatingSignerProvider, jwt::verify_with_signer_provider};
//!
//! # fn example(provider: &RotatingSignerProvider, token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let claims = verify_with_signer_provider(token, provider, Some("https%3A%2F%2Flogin.example.com"))?;
//! println!("subject: {}", claims.sub);
//! # Ok(())
//! # }
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use serde::{Deserialize, Serialize};

use crate::{
    error::AuthError,
    provider::RotatingSignerProvider,
    validation::{validate_algorithm, validate_kid},
};

/// Allowed clock skew, in seconds, when checking `nbf` and `iat`.
///
/// Expiration is never extended by this leeway.
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// Claims carried by an issued bearer token.
///
/// ```json
/// {
///   "jti": "0b9f6c1e-3f0a-4c55-9a57-8f3f4f1d2a10",
///   "sub": "alice@example.com",
///   "iss": "https%3A%2F%2Flogin.example.com",
///   "aud": "https%3A%2F%2Flogin.example.com",
///   "nbf": 1700000000,
///   "iat": 1700000000,
///   "exp": 1700043200,
///   "preferred_username": "alice"
/// }
/// ```
///
/// Timestamps are seconds since the Unix epoch. Issued tokens always satisfy
/// `nbf <= iat <= exp` and `iss == aud`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerClaims {
    /// Unique token identifier (UUID v4).
    pub jti: String,
    /// Subject: the authenticated principal.
    pub sub: String,
    /// Issuer, URL-encoded.
    pub iss: String,
    /// Audience, identical to the issuer.
    pub aud: String,
    /// Not before.
    pub nbf: u64,
    /// Issued at.
    pub iat: u64,
    /// Expiration.
    pub exp: u64,
    /// Display username.
    pub preferred_username: String,
}

/// Decode JWT header without verification.
///
/// # Errors
///
/// Returns an error if the JWT header cannot be decoded.
pub fn decode_jwt_header(token: &str) -> Result<Header, AuthError> {
    decode_header(token)
        .map_err(|e| AuthError::invalid_token_format(format!("Failed to decode JWT header: {e}")))
}

/// Decode JWT claims without verification.
///
/// # Errors
///
/// Returns an error if:
/// - The JWT does not have exactly 3 parts
/// - The payload cannot be base64url-decoded or parsed as [`BearerClaims`]
/// - `jti`, `sub`, `iss` or `aud` is empty
pub fn decode_jwt_claims(token: &str) -> Result<BearerClaims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::invalid_token_format("JWT must have 3 parts separated by dots"));
    }

    let payload_bytes = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|e| {
        AuthError::invalid_token_format(format!("Failed to decode JWT payload: {e}"))
    })?;

    let claims: BearerClaims = serde_json::from_slice(&payload_bytes).map_err(|e| {
        AuthError::invalid_token_format(format!("Failed to parse JWT claims: {e}"))
    })?;

    for (name, value) in
        [("jti", &claims.jti), ("sub", &claims.sub), ("iss", &claims.iss), ("aud", &claims.aud)]
    {
        if value.is_empty() {
            return Err(AuthError::missing_claim(name));
        }
    }

    Ok(claims)
}

/// Validate claim timestamps and audience against the current time.
///
/// # Errors
///
/// Returns an error if:
/// - The token has expired
/// - `nbf` or `iat` is in the future by more than [`DEFAULT_LEEWAY_SECS`]
/// - `iat` is after `exp`
/// - The audience doesn't match `expected_audience` (if provided)
pub fn validate_claims(
    claims: &BearerClaims,
    expected_audience: Option<&str>,
) -> Result<(), AuthError> {
    let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();

    if claims.exp <= now {
        return Err(AuthError::token_expired());
    }

    if claims.nbf > now.saturating_add(DEFAULT_LEEWAY_SECS) {
        return Err(AuthError::token_not_yet_valid());
    }

    if claims.iat > now.saturating_add(DEFAULT_LEEWAY_SECS) {
        return Err(AuthError::invalid_token_format("iat claim is in the future"));
    }

    if claims.iat > claims.exp {
        return Err(AuthError::invalid_token_format("iat claim is after exp"));
    }

    if let Some(expected) = expected_audience
        && claims.aud != expected
    {
        return Err(AuthError::invalid_audience(format!(
            "expected '{expected}', got '{}'",
            claims.aud
        )));
    }

    Ok(())
}

/// Verify JWT signature with a public key.
///
/// Checks `exp` with no leeway, as [`validate_claims`] does. `nbf`, `iat`
/// and the audience are left to [`validate_claims`].
///
/// # Errors
///
/// Returns an error if signature verification fails or the token is expired.
pub fn verify_signature(
    token: &str,
    key: &DecodingKey,
    algorithm: Algorithm,
) -> Result<BearerClaims, AuthError> {
    let mut validation = Validation::new(algorithm);
    validation.leeway = 0;
    validation.validate_exp = true;
    validation.validate_nbf = false;
    validation.validate_aud = false;

    let token_data = decode::<BearerClaims>(token, key, &validation)?;

    Ok(token_data.claims)
}

/// Verify a token against the keys held by a [`RotatingSignerProvider`].
///
/// 1. Decodes the header and requires a well-formed `kid`
/// 2. Checks the algorithm against [`crate::validation::ACCEPTED_ALGORITHMS`],
///    then requires `EdDSA`, the only key family the provider holds
/// 3. Fetches the verification key for the `kid`
/// 4. Verifies the signature, then the claims
///
/// # Errors
///
/// Returns an error if:
/// - The JWT is malformed or has no `kid`
/// - The algorithm is forbidden or unknown
/// - The key is unknown ([`AuthError::KeyNotFound`]) or revoked ([`AuthError::KeyRevoked`])
/// - The signature or claims are invalid
#[tracing::instrument(skip(token, provider))]
pub fn verify_with_signer_provider(
    token: &str,
    provider: &RotatingSignerProvider,
    expected_audience: Option<&str>,
) -> Result<BearerClaims, AuthError> {
    let header = decode_jwt_header(token)?;

    let kid = header
        .kid
        .ok_or_else(|| AuthError::invalid_token_format("JWT header missing 'kid' field"))?;
    validate_kid(&kid)?;

    validate_algorithm(&format!("{:?}", header.alg))?;
    if header.alg != Algorithm::EdDSA {
        return Err(AuthError::unsupported_algorithm(format!(
            "Algorithm '{:?}' cannot be verified with Ed25519 signing keys",
            header.alg
        )));
    }

    let decoding_key = provider.decoding_key(&kid).inspect_err(|e| {
        tracing::warn!(kid = %kid, error = %e, "verification key unavailable");
    })?;

    let claims = verify_signature(token, &decoding_key, header.alg)?;
    validate_claims(&claims, expected_audience)?;

    tracing::debug!(kid = %kid, subject = %claims.sub, "bearer token verified");
    Ok(claims)
}
