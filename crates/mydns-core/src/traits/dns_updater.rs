// # DNS Updater Trait
//
// Defines the interface for one complete update attempt: resolve the caller's
// public IP, then submit it to the dynamic-DNS provider.
//
// ## Implementations
//
// - MyDNS over HTTP: `mydns-http` crate (`DnsUpdateClient`)
// - Test doubles: `tests/common` in this crate
//
// ## Usage
//
// ```rust,ignore
// use mydns_core::{Credentials, DnsUpdater};
//
// #[tokio::main]
// async fn main() {
//     let client = /* DnsUpdater implementation */;
//     let result = client.update(&Credentials::new("mydns123456", "secret")).await;
//     println!("{} at {}", result.status, result.timestamp);
// }
// ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MyDNS login pair
///
/// Supplied by the outer layer on every attempt and never persisted by the core.
/// The Debug implementation does NOT expose the password.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    /// MyDNS master ID (`MID`)
    pub master_id: String,
    /// MyDNS password (`PWD`)
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("master_id", &self.master_id)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl Credentials {
    /// Create a credential pair
    pub fn new(master_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            master_id: master_id.into(),
            password: password.into(),
        }
    }

    /// Both fields are required
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.master_id.is_empty() {
            return Err(crate::Error::invalid_input("master ID is required"));
        }
        if self.password.is_empty() {
            return Err(crate::Error::invalid_input("password is required"));
        }
        Ok(())
    }
}

/// Outcome of one update attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    /// Provider answered with a 2xx status
    Success,
    /// Any transport, status or parse failure along the way
    Failure,
}

impl UpdateStatus {
    /// Label shown in history listings
    pub fn label(&self) -> &'static str {
        match self {
            UpdateStatus::Success => "Update succeeded",
            UpdateStatus::Failure => "Update failed",
        }
    }

    /// Whether the attempt succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateStatus::Success)
    }
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Record of one completed attempt. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateResult {
    /// Mapped outcome
    pub status: UpdateStatus,
    /// When the attempt completed
    pub timestamp: DateTime<Utc>,
}

impl UpdateResult {
    /// Create a result stamped with the current time
    pub fn now(status: UpdateStatus) -> Self {
        Self::at(status, Utc::now())
    }

    /// Create a result with an explicit timestamp
    pub fn at(status: UpdateStatus, timestamp: DateTime<Utc>) -> Self {
        Self { status, timestamp }
    }

    /// Successful attempt completing now
    pub fn success() -> Self {
        Self::now(UpdateStatus::Success)
    }

    /// Failed attempt completing now
    pub fn failure() -> Self {
        Self::now(UpdateStatus::Failure)
    }
}

/// Trait for update client implementations
///
/// One call performs one complete attempt: a single lookup request followed by at
/// most one provider request. There is no retry; the next interval tick is the
/// only retry mechanism.
///
/// # Error Handling
///
/// Implementations must not return errors or panic on network conditions. Every
/// transport, status and parse failure is folded into
/// `UpdateResult { status: Failure, .. }` so the scheduler loop keeps running.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsUpdater: Send + Sync {
    /// Resolve the public IP and push it to the provider
    ///
    /// # Parameters
    ///
    /// - `credentials`: The credential pair read at the start of this attempt
    ///
    /// # Returns
    ///
    /// The mapped outcome, stamped with the completion time
    async fn update(&self, credentials: &Credentials) -> UpdateResult;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
