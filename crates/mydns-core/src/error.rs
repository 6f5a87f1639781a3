//! Error types for the MyDNS updater
//!
//! Network and parse failures (`Transport`, `HttpStatus`, `Parse`) never escape the
//! update client: they are folded into a failed [`crate::UpdateResult`]. `Busy` and
//! `State` are contract violations returned to whoever drives the scheduler.

use thiserror::Error;

/// Result type alias for updater operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which of the two outbound requests an HTTP status belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    /// Public IP lookup
    Lookup,
    /// Provider update URL
    Update,
}

impl std::fmt::Display for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStage::Lookup => f.write_str("IP lookup"),
            RequestStage::Update => f.write_str("provider update"),
        }
    }
}

/// Core error type for the updater
#[derive(Error, Debug)]
pub enum Error {
    /// Connection, DNS, TLS or timeout failure on either request
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response
    #[error("HTTP error during {stage}: status {status}")]
    HttpStatus {
        /// Request that failed
        stage: RequestStage,
        /// Status code returned by the server
        status: u16,
    },

    /// Malformed IP lookup body
    #[error("Parse error: {0}")]
    Parse(String),

    /// An update attempt is already in flight
    #[error("An update is already in progress")]
    Busy,

    /// Operation not valid in the current scheduler state
    #[error("Invalid scheduler state: {0}")]
    State(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an HTTP status error
    pub fn http_status(stage: RequestStage, status: u16) -> Self {
        Self::HttpStatus { stage, status }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a scheduler state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error comes from network conditions rather than caller misuse
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::HttpStatus { .. } | Error::Parse(_)
        )
    }
}
