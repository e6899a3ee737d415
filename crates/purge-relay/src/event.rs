//! Cache invalidation event data model.
//!
//! [`InvalidationEvent`] is the typed form of one broker notification: the
//! key of the stale cached item plus any producer-specific metadata fields,
//! which are carried through unmodified.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One cache-invalidation notification.
///
/// Constructed fresh per received message by the decoder and owned by the
/// delivery pipeline until handed to subscribers. Subscribers receive a
/// shared reference and must clone anything they keep beyond the callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Identifier of the affected cached item.
    ///
    /// After decode the listener rewrites this into the canonical
    /// `namespace:publicationId:itemId` form before delivery.
    #[serde(rename = "Key")]
    pub key: String,

    /// Additional payload fields, passed through unmodified.
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl InvalidationEvent {
    /// Creates an event with the given key and no metadata.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            metadata: Map::new(),
        }
    }
}
