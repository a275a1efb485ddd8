//! Time source for issuance and key selection.

use chrono::{DateTime, Utc};

/// Source of the current instant.
///
/// Injected into the issuer and the rotating provider so tests can control
/// `iat`/`nbf` and key validity windows.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// [`Clock`] backed by the system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
