//! Wire shapes exchanged with the secret service.
//!
//! The [`SecretEnvelope`] layout is a compatibility contract with secrets that
//! are already stored: a single `value` field holding a string or `null`.
//! Renaming or nesting that field would orphan every existing secret.

use serde::{Deserialize, Serialize};

/// Name of the single field inside a stored secret.
pub const ENVELOPE_VALUE_FIELD: &str = "value";

/// Canonical stored form of a key-value secret.
///
/// Serializes as exactly `{"value": <string-or-null>}`.
///
/// # Examples
///
/// ```
/// use trustgate_vault::SecretEnvelope;
///
/// let envelope = SecretEnvelope::new("hunter2");
/// let json = serde_json::to_string(&envelope).unwrap();
/// assert_eq!(json, r#"{"value":"hunter2"}"#);
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEnvelope {
    /// The secret value. `None` serializes as `null`.
    pub value: Option<String>,
}

impl SecretEnvelope {
    /// Creates an envelope holding `value`.
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: Some(value.into()) }
    }

    /// Creates an envelope whose value is an explicit `null`.
    #[must_use]
    pub fn null() -> Self {
        Self { value: None }
    }
}

impl std::fmt::Debug for SecretEnvelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = if self.value.is_some() { "Some(<redacted>)" } else { "None" };
        f.debug_struct("SecretEnvelope").field("value", &format_args!("{value}")).finish()
    }
}

/// Raw read response from a key-value handle.
///
/// Mirrors the service's read payload, where the stored secret sits under
/// `data`. A response whose `data` is absent breaks the envelope contract and
/// is rejected by the facade.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyValueResponse {
    /// The stored secret object, if the service returned one.
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl KeyValueResponse {
    /// Wraps an envelope as the service would return it.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the envelope cannot be encoded.
    pub fn from_envelope(envelope: &SecretEnvelope) -> serde_json::Result<Self> {
        Ok(Self { data: Some(serde_json::to_value(envelope)?) })
    }
}

/// Outcome of reading a key-value secret.
///
/// Keeps "no secret at this key" apart from "a secret whose value is `null`".
///
/// # Examples
///
/// ```
/// use trustgate_vault::SecretLookup;
///
/// let found = SecretLookup::Found(Some("s3cr3t".to_owned()));
/// assert_eq!(found.value(), Some("s3cr3t"));
/// assert!(found.is_found());
///
/// assert_eq!(SecretLookup::NotFound.value(), None);
/// assert!(!SecretLookup::NotFound.is_found());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub enum SecretLookup {
    /// A secret exists at the key. The inner value is `None` only when the
    /// service explicitly stored `null`.
    Found(Option<String>),
    /// No secret exists at the key.
    NotFound,
}

impl SecretLookup {
    /// Returns the secret value when one was found and is not `null`.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Found(value) => value.as_deref(),
            Self::NotFound => None,
        }
    }

    /// Returns `true` if a secret exists at the key, including a `null` one.
    #[must_use]
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Consumes the lookup, returning `Some(value)` for found secrets.
    #[must_use]
    pub fn into_found(self) -> Option<Option<String>> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound => None,
        }
    }
}

impl std::fmt::Debug for SecretLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(Some(_)) => f.write_str("Found(Some(<redacted>))"),
            Self::Found(None) => f.write_str("Found(None)"),
            Self::NotFound => f.write_str("NotFound"),
        }
    }
}

/// Version of the key-value secrets engine mounted at a namespace.
///
/// The facade always asks for handles of the configured engine; the default
/// is the unversioned v1 engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyValueEngine {
    /// Unversioned key-value engine.
    #[default]
    V1,
    /// Versioned key-value engine.
    V2,
}

impl std::fmt::Display for KeyValueEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::V1 => f.write_str("v1"),
            Self::V2 => f.write_str("v2"),
        }
    }
}
