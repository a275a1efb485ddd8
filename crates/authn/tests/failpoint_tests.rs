#![allow(clippy::expect_used, clippy::panic)]
//! Integration tests for fail-point injection in the authn crate.
//!
//! These tests require both `failpoints` and `testutil` features:
//! ```bash
//! cargo test -p trustgate-authn --features failpoints,testutil --test failpoint_tests
//! ```

use std::sync::Arc;

use chrono::{Duration, Utc};
use trustgate_authn::{
    AuthenticationToken, BearerTokenIssuer, RotatingSignerProvider, SignerProvider,
    assert_auth_error, error::AuthError,
};

fn provider_with_key() -> Arc<RotatingSignerProvider> {
    let provider = Arc::new(RotatingSignerProvider::new());
    provider.rotate(Duration::hours(6)).expect("failed to rotate");
    provider
}

fn identity() -> AuthenticationToken {
    AuthenticationToken::new(
        "alice@example.com",
        "https://login.example.com",
        Utc::now() + Duration::hours(1),
    )
}

#[tokio::test]
async fn select_signer_failpoint_returns_key_provider_error() {
    let scenario = fail::FailScenario::setup();
    let provider = provider_with_key();

    fail::cfg("provider-select-signer", "return").expect("failed to configure fail point");

    let result = provider.select_signer(Utc::now() + Duration::hours(1)).await;
    assert_auth_error!(result, KeyProvider, "selection should fail when fail point is active");

    scenario.teardown();
}

#[tokio::test]
async fn select_signer_failpoint_propagates_through_issuer() {
    let scenario = fail::FailScenario::setup();
    let provider = provider_with_key();
    let issuer = BearerTokenIssuer::new(provider);

    fail::cfg("provider-select-signer", "return").expect("failed to configure fail point");

    let result = issuer.get_bearer_token(&identity()).await;
    match result {
        Err(AuthError::KeyProvider { message, .. }) => {
            assert!(message.contains("provider-select-signer"), "unexpected message: {message}");
        },
        other => panic!("expected KeyProvider error, got: {other:?}"),
    }

    scenario.teardown();
}

#[tokio::test]
async fn select_signer_without_failpoint_succeeds() {
    let scenario = fail::FailScenario::setup();
    let issuer = BearerTokenIssuer::new(provider_with_key());

    let result = issuer.get_bearer_token(&identity()).await;
    assert!(result.is_ok(), "issuance should succeed without fail point: {result:?}");

    scenario.teardown();
}

#[tokio::test]
async fn select_signer_recovers_after_failpoint_removed() {
    let scenario = fail::FailScenario::setup();
    let provider = provider_with_key();
    let issuer = BearerTokenIssuer::new(provider);

    fail::cfg("provider-select-signer", "return").expect("failed to configure fail point");
    assert!(issuer.get_bearer_token(&identity()).await.is_err());

    fail::remove("provider-select-signer");
    assert!(issuer.get_bearer_token(&identity()).await.is_ok());

    scenario.teardown();
}
