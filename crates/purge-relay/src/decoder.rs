//! Event payload decoding.
//!
//! [`EventDecoder`] turns a raw text payload into an [`InvalidationEvent`].
//! It is stateless and explicitly constructed; the listener takes an
//! injected instance rather than reaching for a process-wide serializer.

use crate::error::{RelayError, RelayResult};
use crate::event::InvalidationEvent;

/// Stateless JSON decoder for invalidation event payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventDecoder;

impl EventDecoder {
    /// Creates a new decoder.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decodes a text payload into an [`InvalidationEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Decode`] when the payload is not well-formed
    /// JSON or does not match the expected event shape (an object with a
    /// string `Key` field).
    pub fn decode(&self, payload: &str) -> RelayResult<InvalidationEvent> {
        let event: InvalidationEvent = serde_json::from_str(payload)?;
        Ok(event)
    }
}
