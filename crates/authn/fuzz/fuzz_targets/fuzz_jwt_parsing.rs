//! Fuzz target for bearer token parsing and verification.
//!
//! Feeds arbitrary byte strings as tokens to the decoding, validation and
//! verification functions. Every result must be either `Ok(...)` or
//! `Err(AuthError)`; panics and hangs are findings.

#![no_main]

use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use trustgate_authn::{
    RotatingSignerProvider,
    jwt::{decode_jwt_claims, decode_jwt_header, validate_claims, verify_with_signer_provider},
};

static PROVIDER: LazyLock<RotatingSignerProvider> = LazyLock::new(|| {
    let provider = RotatingSignerProvider::new();
    let _ = provider.rotate(chrono::Duration::days(365));
    provider
});

fuzz_target!(|data: &[u8]| {
    // Tokens are always UTF-8 strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    let header_result = decode_jwt_header(token);
    let claims_result = decode_jwt_claims(token);

    if let Ok(ref claims) = claims_result {
        let _ = validate_claims(claims, None);
        let _ = validate_claims(claims, Some("https%3A%2F%2Flogin.example.com"));
        let _ = validate_claims(claims, Some(&claims.aud));
    }

    if let Ok(ref header) = header_result {
        let alg_str = format!("{:?}", header.alg);
        let _ = trustgate_authn::validate_algorithm(&alg_str);

        if let Some(ref kid) = header.kid {
            let _ = trustgate_authn::validate_kid(kid);
        }
    }

    // Nothing random can carry a valid Ed25519 signature.
    assert!(verify_with_signer_provider(token, &PROVIDER, None).is_err());
});
