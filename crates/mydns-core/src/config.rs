//! Configuration types for the updater
//!
//! Credentials are deliberately absent: they live with the outer layer and are
//! handed to the scheduler at runtime.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::str::FromStr;
use std::time::Duration;

/// Public IP lookup service
pub const DEFAULT_LOOKUP_URL: &str = "http://jsonip.com/";

/// MyDNS direct-IP update endpoint
pub const DEFAULT_UPDATE_URL: &str = "http://www.mydns.jp/directip.html";

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// URL returning `{"ip": "..."}`
    #[serde(default = "default_lookup_url")]
    pub lookup_url: String,

    /// Provider endpoint; `MID`, `PWD` and `IPV4ADDR` are appended as query parameters
    #[serde(default = "default_update_url")]
    pub update_url: String,

    /// Timeout applied to each of the two requests (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ClientConfig {
    /// Create a configuration pointing at the fixed public services
    pub fn new() -> Self {
        Self {
            lookup_url: default_lookup_url(),
            update_url: default_update_url(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Override both endpoints
    pub fn with_endpoints(mut self, lookup_url: impl Into<String>, update_url: impl Into<String>) -> Self {
        self.lookup_url = lookup_url.into();
        self.update_url = update_url.into();
        self
    }

    /// Override the request timeout
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Request timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Validate the client configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_http_url("lookup_url", &self.lookup_url)?;
        validate_http_url("update_url", &self.update_url)?;

        if !(1..=300).contains(&self.timeout_secs) {
            return Err(crate::Error::config(format!(
                "timeout_secs must be between 1 and 300 seconds. Got: {}",
                self.timeout_secs
            )));
        }

        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_http_url(field: &str, url: &str) -> Result<(), crate::Error> {
    if url.is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", field)));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(crate::Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            field, url
        )));
    }
    Ok(())
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Capacity of the scheduler event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SchedulerConfig {
    /// Validate the scheduler configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Seconds between interval ticks
///
/// Parsed from user text: ASCII digits only, and strictly positive since a zero
/// period cannot arm a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct UpdateSpan(NonZeroU64);

impl UpdateSpan {
    /// Create a span from whole seconds
    pub fn from_secs(secs: u64) -> Result<Self, crate::Error> {
        NonZeroU64::new(secs)
            .map(Self)
            .ok_or_else(|| crate::Error::invalid_input("update span must be greater than zero"))
    }

    /// Span in whole seconds
    pub fn as_secs(&self) -> u64 {
        self.0.get()
    }

    /// Span as a Duration
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0.get())
    }
}

impl FromStr for UpdateSpan {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(crate::Error::invalid_input("update span is required"));
        }
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(crate::Error::invalid_input(format!(
                "update span must contain digits only. Got: '{}'",
                s
            )));
        }
        let secs: u64 = s
            .parse()
            .map_err(|e| crate::Error::invalid_input(format!("update span out of range: {}", e)))?;
        Self::from_secs(secs)
    }
}

impl TryFrom<u64> for UpdateSpan {
    type Error = crate::Error;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::from_secs(secs)
    }
}

impl From<UpdateSpan> for u64 {
    fn from(span: UpdateSpan) -> Self {
        span.as_secs()
    }
}

impl std::fmt::Display for UpdateSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.0)
    }
}

fn default_lookup_url() -> String {
    DEFAULT_LOOKUP_URL.to_string()
}

fn default_update_url() -> String {
    DEFAULT_UPDATE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    100
}
