//! Configuration for the secret service connection.
//!
//! [`VaultConfig`] carries what a transport needs to reach the service and
//! which key-value engine the facade asks handles for. It is validated once,
//! when built or when the facade is constructed from it.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    error::{VaultError, VaultResult},
    types::KeyValueEngine,
};

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout (15 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for the secret service.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use trustgate_vault::{KeyValueEngine, VaultConfig};
///
/// let config = VaultConfig::builder()
///     .uri("https://vault.internal:8200")
///     .token("s.example-token")
///     .read_timeout(Duration::from_secs(30))
///     .build()?;
///
/// assert_eq!(config.uri(), "https://vault.internal:8200");
/// assert_eq!(config.kv_engine(), KeyValueEngine::V1);
/// # Ok::<(), trustgate_vault::VaultError>(())
/// ```
///
/// Deserialized configurations are validated by
/// [`VaultCommunicationService::new`](crate::VaultCommunicationService::new):
///
/// ```
/// use trustgate_vault::VaultConfig;
///
/// let config: VaultConfig = serde_json::from_str(
///     r#"{"uri": "http://127.0.0.1:8200", "token": "root", "read_timeout": "2s"}"#,
/// ).unwrap();
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Base URI of the service (`http://` or `https://`).
    pub(crate) uri: String,

    /// Authentication token presented by the transport.
    #[serde(skip_serializing)]
    pub(crate) token: Zeroizing<String>,

    /// Key-value engine version mounted at the namespaces this service uses.
    #[serde(default)]
    pub(crate) kv_engine: KeyValueEngine,

    /// Connection timeout.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub(crate) connect_timeout: Duration,

    /// Read timeout.
    #[serde(with = "humantime_serde", default = "default_read_timeout")]
    pub(crate) read_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_read_timeout() -> Duration {
    DEFAULT_READ_TIMEOUT
}

#[bon::bon]
impl VaultConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Arguments
    ///
    /// * `uri` - Base URI of the service. Must use `http` or `https`.
    /// * `token` - Authentication token. Must not be empty.
    ///
    /// # Optional Fields
    ///
    /// * `kv_engine` - Key-value engine version (default: v1).
    /// * `connect_timeout` - Connection timeout (default: 5 seconds).
    /// * `read_timeout` - Read timeout (default: 15 seconds).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if any field is invalid.
    #[builder]
    pub fn new(
        #[builder(into)] uri: String,
        #[builder(into)] token: String,
        #[builder(default)] kv_engine: KeyValueEngine,
        #[builder(default = DEFAULT_CONNECT_TIMEOUT)] connect_timeout: Duration,
        #[builder(default = DEFAULT_READ_TIMEOUT)] read_timeout: Duration,
    ) -> VaultResult<Self> {
        let config =
            Self { uri, token: Zeroizing::new(token), kv_engine, connect_timeout, read_timeout };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field, returning the first problem found.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Configuration`] if:
    /// - The URI is empty, lacks a host, or uses a scheme other than `http`/`https`
    /// - The token is empty or only whitespace
    /// - Either timeout is zero
    pub fn validate(&self) -> VaultResult<()> {
        let host = self
            .uri
            .strip_prefix("https://")
            .or_else(|| self.uri.strip_prefix("http://"))
            .ok_or_else(|| {
                VaultError::configuration(format!(
                    "uri '{}' must use the http or https scheme",
                    self.uri
                ))
            })?;

        if host.trim_end_matches('/').is_empty() {
            return Err(VaultError::configuration(format!("uri '{}' has no host", self.uri)));
        }

        if self.token.trim().is_empty() {
            return Err(VaultError::configuration("token cannot be empty"));
        }

        if self.connect_timeout.is_zero() {
            return Err(VaultError::configuration("connect_timeout must be greater than zero"));
        }

        if self.read_timeout.is_zero() {
            return Err(VaultError::configuration("read_timeout must be greater than zero"));
        }

        Ok(())
    }

    /// Returns the service URI.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Returns the authentication token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Returns the key-value engine version.
    #[must_use]
    pub fn kv_engine(&self) -> KeyValueEngine {
        self.kv_engine
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the read timeout.
    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

impl std::fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultConfig")
            .field("uri", &self.uri)
            .field("token", &"<redacted>")
            .field("kv_engine", &self.kv_engine)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}
