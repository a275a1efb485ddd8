//! Structured fuzz target for bearer claim parsing and validation.
//!
//! Uses the `arbitrary` crate to generate token-shaped inputs, so the
//! fuzzer spends its time past base64 and JSON decoding instead of failing
//! at the first byte.

#![no_main]

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use libfuzzer_sys::fuzz_target;
use serde_json::{Map, Value};
use trustgate_authn::jwt::{decode_jwt_claims, decode_jwt_header, validate_claims};

/// Structured input assembled into `header.payload.signature`.
#[derive(Debug, Arbitrary)]
struct FuzzedJwt {
    alg: FuzzedAlg,
    kid: Option<String>,
    jti: Option<String>,
    sub: String,
    iss: String,
    aud: String,
    nbf: u64,
    iat: u64,
    exp: u64,
    preferred_username: Option<String>,
    signature_bytes: Vec<u8>,
    include_typ: bool,
}

/// Algorithm values covering known attack vectors.
#[derive(Debug, Arbitrary)]
enum FuzzedAlg {
    EdDSA,
    None,
    HS256,
    HS384,
    HS512,
    RS256,
    ES256,
    PS512,
    Other(String),
}

impl FuzzedAlg {
    fn as_str(&self) -> &str {
        match self {
            Self::EdDSA => "EdDSA",
            Self::None => "none",
            Self::HS256 => "HS256",
            Self::HS384 => "HS384",
            Self::HS512 => "HS512",
            Self::RS256 => "RS256",
            Self::ES256 => "ES256",
            Self::PS512 => "PS512",
            Self::Other(s) => s,
        }
    }
}

fn build_jwt(input: &FuzzedJwt) -> String {
    let mut header = Map::new();
    header.insert("alg".into(), Value::from(input.alg.as_str()));
    if input.include_typ {
        header.insert("typ".into(), Value::from("JWT"));
    }
    if let Some(ref kid) = input.kid {
        header.insert("kid".into(), Value::from(kid.as_str()));
    }

    let mut payload = Map::new();
    if let Some(ref jti) = input.jti {
        payload.insert("jti".into(), Value::from(jti.as_str()));
    }
    payload.insert("sub".into(), Value::from(input.sub.as_str()));
    payload.insert("iss".into(), Value::from(input.iss.as_str()));
    payload.insert("aud".into(), Value::from(input.aud.as_str()));
    payload.insert("nbf".into(), Value::from(input.nbf));
    payload.insert("iat".into(), Value::from(input.iat));
    payload.insert("exp".into(), Value::from(input.exp));
    if let Some(ref name) = input.preferred_username {
        payload.insert("preferred_username".into(), Value::from(name.as_str()));
    }

    let header_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&Value::Object(header)).unwrap_or_default());
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&Value::Object(payload)).unwrap_or_default());
    let sig_b64 = URL_SAFE_NO_PAD.encode(&input.signature_bytes);

    format!("{header_b64}.{payload_b64}.{sig_b64}")
}

fuzz_target!(|input: FuzzedJwt| {
    let token = build_jwt(&input);

    let header_result = decode_jwt_header(&token);
    let claims_result = decode_jwt_claims(&token);

    if let Ok(ref claims) = claims_result {
        assert!(!claims.jti.is_empty() && !claims.sub.is_empty());
        let _ = validate_claims(claims, None);
        let _ = validate_claims(claims, Some(&claims.iss));
    }

    if let Ok(ref header) = header_result {
        let alg_str = format!("{:?}", header.alg);
        let _ = trustgate_authn::validate_algorithm(&alg_str);

        if let Some(ref kid) = header.kid {
            let _ = trustgate_authn::validate_kid(kid);
        }
    }
});
