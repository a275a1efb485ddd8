//! Bearer token issuance.
//!
//! [`BearerTokenIssuer`] turns an [`AuthenticationToken`] into a signed
//! compact JWS. Each call resolves its signer from the [`SignerProvider`]
//! using the token expiration, so rotation takes effect immediately and a key
//! never signs a token that outlives it.
//!
//! # Claims
//!
//! | Claim | Value |
//! |-------|-------|
//! | `jti` | random UUID v4 |
//! | `sub` | principal |
//! | `iss`, `aud` | identity issuer, URL-encoded once (form encoding, UTF-8) |
//! | `nbf`, `iat` | issuance instant |
//! | `exp` | identity expiration |
//! | `preferred_username` | identity name |
//!
//! Issuance is not idempotent: repeated calls produce distinct `jti` values.

use std::sync::Arc;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use jsonwebtoken::Header;
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    error::{AuthError, Result},
    identity::AuthenticationToken,
    jwt::BearerClaims,
    provider::SignerProvider,
    signer::SignerHandle,
    validation::validate_algorithm,
};

/// Issues signed bearer tokens for authenticated identities.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::{Duration, Utc};
/// use trustgate_authn::{AuthenticationToken, BearerTokenIssuer, RotatingSignerProvider};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let provider = Arc::new(RotatingSignerProvider::new());
/// provider.rotate(Duration::hours(12)).unwrap();
///
/// let issuer = BearerTokenIssuer::new(provider);
/// let identity = AuthenticationToken::new(
///     "alice@example.com",
///     "https://login.example.com",
///     Utc::now() + Duration::hours(1),
/// );
///
/// let token = issuer.get_bearer_token(&identity).await.unwrap();
/// assert_eq!(token.split('.').count(), 3);
/// # });
/// ```
pub struct BearerTokenIssuer {
    provider: Arc<dyn SignerProvider>,
    clock: Arc<dyn Clock>,
}

impl BearerTokenIssuer {
    /// Creates an issuer using the system clock.
    #[must_use]
    pub fn new(provider: Arc<dyn SignerProvider>) -> Self {
        Self::with_clock(provider, Arc::new(SystemClock))
    }

    /// Creates an issuer that stamps `nbf`/`iat` from `clock`.
    #[must_use]
    pub fn with_clock(provider: Arc<dyn SignerProvider>, clock: Arc<dyn Clock>) -> Self {
        Self { provider, clock }
    }

    /// Issues a signed bearer token for `token`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Precondition`] if the principal, name or issuer is missing or empty, or the
    ///   expiration is not after now. The provider is not consulted.
    /// - Any error from [`SignerProvider::select_signer`], unchanged
    /// - [`AuthError::Signing`] if the resolved algorithm is not allowed or signing fails
    #[tracing::instrument(skip(self, token), fields(issuer = %token.issuer))]
    pub async fn get_bearer_token(&self, token: &AuthenticationToken) -> Result<String> {
        let now = self.clock.now();
        let claims = build_claims(token, now)?;

        let handle = self.provider.select_signer(token.expiration).await.inspect_err(|e| {
            tracing::warn!(error = %e, "no signer for bearer token");
        })?;

        let signed = sign_claims(&handle, &claims).inspect_err(|e| {
            tracing::warn!(kid = %handle.key_identifier(), error = %e, "bearer token signing failed");
        })?;

        tracing::debug!(
            kid = %handle.key_identifier(),
            subject = %claims.sub,
            "signed bearer token"
        );
        Ok(signed)
    }
}

/// URL-encodes `value` the way HTML forms do: UTF-8, space as `+`, and only
/// `A-Z a-z 0-9 - . _ *` left as-is.
#[must_use]
pub fn url_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AuthError::precondition(format!("{what} required"))),
    }
}

fn epoch_seconds(instant: DateTime<Utc>, what: &str) -> Result<u64> {
    u64::try_from(instant.timestamp())
        .map_err(|_| AuthError::precondition(format!("{what} is before the Unix epoch")))
}

fn build_claims(token: &AuthenticationToken, now: DateTime<Utc>) -> Result<BearerClaims> {
    let subject = required(token.principal.as_deref(), "principal")?;
    let username = required(token.name.as_deref(), "name")?;
    let issuer = required(Some(token.issuer.as_str()), "issuer")?;

    if token.expiration <= now {
        return Err(AuthError::precondition(format!(
            "expiration {} is not after issuance time {now}",
            token.expiration
        )));
    }

    let issued_at = epoch_seconds(now, "issuance time")?;
    let expires_at = epoch_seconds(token.expiration, "expiration")?;
    let issuer = url_encode(issuer);

    Ok(BearerClaims {
        jti: Uuid::new_v4().to_string(),
        sub: subject.to_owned(),
        aud: issuer.clone(),
        iss: issuer,
        nbf: issued_at,
        iat: issued_at,
        exp: expires_at,
        preferred_username: username.to_owned(),
    })
}

fn sign_claims(handle: &SignerHandle, claims: &BearerClaims) -> Result<String> {
    let algorithm = handle.algorithm();
    let algorithm_name = format!("{algorithm:?}");
    let kid = handle.key_identifier();

    validate_algorithm(&algorithm_name)
        .map_err(|e| AuthError::signing(&algorithm_name, kid, e))?;

    if handle.signer().algorithm() != algorithm {
        let mismatch = AuthError::unsupported_algorithm(format!(
            "signer produces {:?}, header declares {algorithm_name}",
            handle.signer().algorithm()
        ));
        return Err(AuthError::signing(&algorithm_name, kid, mismatch));
    }

    let mut header = Header::new(algorithm);
    header.kid = Some(kid.to_owned());

    let header_json =
        serde_json::to_vec(&header).map_err(|e| AuthError::signing(&algorithm_name, kid, e))?;
    let payload_json =
        serde_json::to_vec(claims).map_err(|e| AuthError::signing(&algorithm_name, kid, e))?;

    let signing_input =
        format!("{}.{}", URL_SAFE_NO_PAD.encode(header_json), URL_SAFE_NO_PAD.encode(payload_json));

    let signature = handle.signer().sign(signing_input.as_bytes()).map_err(|source| {
        AuthError::Signing { algorithm: algorithm_name.clone(), kid: kid.to_owned(), source }
    })?;

    Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
}
