//! Relay error types.
//!
//! Provides [`RelayError`] covering connection, decode, acknowledge, and
//! lifecycle failures, plus a convenience [`RelayResult`] alias.

use thiserror::Error;

/// Result alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while bridging broker messages to subscribers.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Failure to establish or maintain the broker connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The payload is not a well-formed invalidation event.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// An inbound message was not a text message and was skipped.
    #[error("received non-text message '{id}'")]
    NonTextMessage {
        /// Broker-assigned message identifier.
        id: String,
    },

    /// Failed to acknowledge a message back to the broker.
    #[error("acknowledge failed: {0}")]
    Acknowledge(String),

    /// An operation was attempted in the wrong lifecycle state.
    #[error("invalid state: expected {expected}, actual {actual}")]
    InvalidState {
        /// The state required for the operation.
        expected: String,
        /// The state the listener was actually in.
        actual: String,
    },

    /// A required configuration key is missing.
    #[error("missing config: {0}")]
    MissingConfig(String),

    /// A configuration value is invalid.
    #[error("invalid config: {0}")]
    ConfigurationError(String),
}
