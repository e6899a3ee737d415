//! # purge-relay
//!
//! A resilient bridge from a topic-based publish/subscribe broker to
//! in-process subscribers of cache-invalidation events.
//!
//! The [`BrokerListener`] maintains a long-lived broker connection through
//! the [`BrokerTransport`] seam, decodes each text message into an
//! [`InvalidationEvent`], normalizes its key into the canonical
//! `namespace:publicationId:itemId` form, and fans it out to every
//! registered [`InvalidationSubscriber`]. Malformed payloads are delivered
//! to subscribers as error notifications, every message is acknowledged
//! exactly once, and connection faults drive an injectable reconnect policy
//! that defaults to retrying indefinitely.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Broker connection and subscription settings
pub mod config;

/// Payload decoding into typed events
pub mod decoder;

/// Relay error taxonomy
pub mod error;

/// Cache invalidation event data model
pub mod event;

/// Cache key normalization
pub mod key;

/// Connection lifecycle and message handling
pub mod listener;

/// Listener metrics counters
pub mod metrics;

/// Reconnection policy
pub mod reconnect;

/// Subscriber registry and fan-out
pub mod registry;

/// Broker transport seam
pub mod transport;

pub use config::RelayConfig;
pub use decoder::EventDecoder;
pub use error::{RelayError, RelayResult};
pub use event::InvalidationEvent;
pub use key::normalize_key;
pub use listener::{BrokerListener, ConnectionState};
pub use metrics::{ListenerMetrics, MetricsSnapshot};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use registry::{InvalidationSubscriber, SubscriptionHandle, SubscriptionRegistry};
pub use transport::{BrokerTarget, BrokerTransport, InboundMessage, MessageBody, TopicConsumer};
