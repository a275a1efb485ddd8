//! End-to-end issuance tests: claims shape, key binding, rotation and
//! concurrency.
#![allow(clippy::expect_used, clippy::panic, clippy::unwrap_used)]

use std::{collections::HashSet, sync::Arc};

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use trustgate_authn::{
    AuthenticationToken, BearerTokenIssuer, Clock, Ed25519Signer, RotatingSignerProvider,
    SigningKeyEntry, assert_auth_error,
    error::AuthError,
    jwt::{decode_jwt_claims, decode_jwt_header, verify_signature, verify_with_signer_provider},
    testutil::{FailingSignerProvider, ManualClock, StaticSignerProvider},
    url_encode,
};

const ISSUER: &str = "https://example.org/nifi";
const ENCODED_ISSUER: &str = "https%3A%2F%2Fexample.org%2Fnifi";

fn identity(expiration: chrono::DateTime<Utc>) -> AuthenticationToken {
    AuthenticationToken::new("alice@example.org", ISSUER, expiration).with_name("Alice Liddell")
}

#[tokio::test]
async fn repeated_issuance_differs_only_in_jti_and_timestamps() {
    let start = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
    let clock = Arc::new(ManualClock::at(start));
    let provider = Arc::new(StaticSignerProvider::ed25519("kid-1"));
    let issuer = BearerTokenIssuer::with_clock(provider.clone(), clock.clone() as Arc<dyn Clock>);
    let identity = identity(start + Duration::hours(12));

    let first = issuer.get_bearer_token(&identity).await.unwrap();
    clock.advance(Duration::seconds(5));
    let second = issuer.get_bearer_token(&identity).await.unwrap();

    let a = decode_jwt_claims(&first).unwrap();
    let b = decode_jwt_claims(&second).unwrap();

    assert_ne!(a.jti, b.jti);
    assert_eq!(b.iat, a.iat + 5);
    assert_eq!(a.sub, b.sub);
    assert_eq!(a.iss, b.iss);
    assert_eq!(a.aud, b.aud);
    assert_eq!(a.exp, b.exp);
    assert_eq!(a.preferred_username, "Alice Liddell");
    assert_eq!(provider.calls(), 2);
    assert_eq!(provider.last_expiration(), Some(identity.expiration));
}

#[tokio::test]
async fn issuer_and_audience_are_encoded_once() {
    let provider = Arc::new(StaticSignerProvider::ed25519("kid-1"));
    let issuer = BearerTokenIssuer::new(provider);

    let token = issuer.get_bearer_token(&identity(Utc::now() + Duration::hours(1))).await.unwrap();
    let claims = decode_jwt_claims(&token).unwrap();

    assert_eq!(claims.iss, ENCODED_ISSUER);
    assert_eq!(claims.aud, ENCODED_ISSUER);
    assert!(!claims.iss.contains("%25"), "issuer must not be double-encoded");
    assert_eq!(claims.nbf, claims.iat);
}

#[tokio::test]
async fn token_carries_kid_and_verifies_only_with_that_key() {
    let first = Arc::new(Ed25519Signer::generate());
    let second = Arc::new(Ed25519Signer::generate());
    let now = Utc::now();

    let provider = Arc::new(RotatingSignerProvider::new());
    provider
        .insert_key(SigningKeyEntry::new(
            "kid-1",
            first.clone(),
            now - Duration::minutes(1),
            now + Duration::hours(2),
        ))
        .unwrap();

    let issuer = BearerTokenIssuer::new(provider.clone());
    let token = issuer.get_bearer_token(&identity(now + Duration::hours(1))).await.unwrap();

    let header = decode_jwt_header(&token).unwrap();
    assert_eq!(header.kid.as_deref(), Some("kid-1"));
    assert_eq!(header.alg, jsonwebtoken::Algorithm::EdDSA);

    let claims =
        verify_signature(&token, &first.decoding_key().unwrap(), jsonwebtoken::Algorithm::EdDSA)
            .expect("signed by kid-1");
    assert_eq!(claims.sub, "alice@example.org");

    let result =
        verify_signature(&token, &second.decoding_key().unwrap(), jsonwebtoken::Algorithm::EdDSA);
    assert!(matches!(result, Err(AuthError::InvalidSignature)), "got: {result:?}");
}

#[tokio::test]
async fn no_eligible_signer_propagates_unchanged() {
    let expiration = Utc::now() + Duration::days(30);
    let provider = Arc::new(FailingSignerProvider::new(AuthError::no_eligible_signer(expiration)));
    let issuer = BearerTokenIssuer::new(provider.clone());

    let result = issuer.get_bearer_token(&identity(expiration)).await;
    match result {
        Err(AuthError::NoEligibleSigner { expiration: reported }) => {
            assert_eq!(reported, expiration);
        },
        other => panic!("expected NoEligibleSigner, got: {other:?}"),
    }
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn missing_principal_never_reaches_provider() {
    let provider = Arc::new(StaticSignerProvider::ed25519("kid-1"));
    let issuer = BearerTokenIssuer::new(provider.clone());

    let mut anonymous = identity(Utc::now() + Duration::hours(1));
    anonymous.principal = None;

    let result = issuer.get_bearer_token(&anonymous).await;
    assert_auth_error!(result, Precondition);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn rotation_moves_new_tokens_to_the_newest_key() {
    let clock = Arc::new(ManualClock::default());
    let provider = Arc::new(RotatingSignerProvider::with_clock(clock.clone() as Arc<dyn Clock>));
    let issuer = BearerTokenIssuer::with_clock(provider.clone(), clock.clone() as Arc<dyn Clock>);

    let old_kid = provider.rotate(Duration::hours(8)).unwrap();
    let old_token =
        issuer.get_bearer_token(&identity(clock.now() + Duration::hours(1))).await.unwrap();

    clock.advance(Duration::seconds(1));
    let new_kid = provider.rotate(Duration::hours(8)).unwrap();
    let new_token =
        issuer.get_bearer_token(&identity(clock.now() + Duration::hours(1))).await.unwrap();

    assert_ne!(old_kid, new_kid);
    assert_eq!(decode_jwt_header(&old_token).unwrap().kid.as_deref(), Some(old_kid.as_str()));
    assert_eq!(decode_jwt_header(&new_token).unwrap().kid.as_deref(), Some(new_kid.as_str()));

    // Tokens from the previous key stay verifiable until it is revoked.
    assert!(verify_with_signer_provider(&old_token, &provider, Some(ENCODED_ISSUER)).is_ok());
    assert!(verify_with_signer_provider(&new_token, &provider, Some(ENCODED_ISSUER)).is_ok());

    provider.revoke(&old_kid).unwrap();
    let result = verify_with_signer_provider(&old_token, &provider, None);
    assert_auth_error!(result, KeyRevoked);
    assert_eq!(provider.active_kids(), vec![new_kid]);
}

#[tokio::test]
async fn expiration_beyond_every_key_is_rejected() {
    let provider = Arc::new(RotatingSignerProvider::new());
    provider.rotate(Duration::hours(1)).unwrap();
    let issuer = BearerTokenIssuer::new(provider);

    let result = issuer.get_bearer_token(&identity(Utc::now() + Duration::hours(2))).await;
    assert_auth_error!(result, NoEligibleSigner);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_issuance_yields_distinct_jti() {
    const CONCURRENCY: usize = 32;

    let provider = Arc::new(RotatingSignerProvider::new());
    provider.rotate(Duration::hours(4)).unwrap();
    let issuer = Arc::new(BearerTokenIssuer::new(provider));
    let expiration = Utc::now() + Duration::hours(1);

    let mut handles = Vec::with_capacity(CONCURRENCY);
    for _ in 0..CONCURRENCY {
        let issuer = Arc::clone(&issuer);
        handles.push(tokio::spawn(async move {
            issuer.get_bearer_token(&identity(expiration)).await.expect("issue")
        }));
    }

    let mut jtis = HashSet::new();
    for handle in handles {
        let token = handle.await.expect("task panicked");
        jtis.insert(decode_jwt_claims(&token).unwrap().jti);
    }
    assert_eq!(jtis.len(), CONCURRENCY);
}

proptest! {
    #[test]
    fn url_encode_decodes_back_to_input(value in "\\PC{0,64}") {
        let encoded = url_encode(&value);
        let decoded: String = form_urlencoded::parse(format!("v={encoded}").as_bytes())
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        prop_assert_eq!(decoded, value);
    }

    #[test]
    fn url_encode_output_is_form_safe(value in "\\PC{0,64}") {
        let encoded = url_encode(&value);
        prop_assert!(encoded.bytes().all(|b| b.is_ascii_alphanumeric() || b"-._*%+".contains(&b)));
    }
}
