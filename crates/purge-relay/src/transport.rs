//! Broker transport seam.
//!
//! The broker's wire protocol is out of scope for the relay. This module
//! defines the traits the listener is written against: a connection factory
//! ([`BrokerTransport`]) producing a topic consumer in client-acknowledge
//! mode ([`TopicConsumer`]). Production deployments implement them on top of
//! a messaging client library; tests implement them as scripted stubs.

use async_trait::async_trait;

use crate::error::RelayError;

/// Resolved broker connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerTarget {
    /// Connection URL (e.g. `tcp://broker.internal:61616`).
    pub url: String,
    /// Topic carrying the invalidation notifications.
    pub topic: String,
}

/// Payload of one inbound broker message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// A text-typed message; the only kind the relay decodes.
    Text(String),
    /// Any non-text message; acknowledged but never decoded or delivered.
    Binary(Vec<u8>),
}

/// One message received from the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Broker-assigned message identifier, used for acknowledgment.
    pub id: String,
    /// Message payload.
    pub body: MessageBody,
}

impl InboundMessage {
    /// Creates a text message.
    #[must_use]
    pub fn text(id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            body: MessageBody::Text(body.into()),
        }
    }

    /// Creates a non-text message.
    #[must_use]
    pub fn binary(id: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            body: MessageBody::Binary(body),
        }
    }
}

/// Connection factory for the broker.
///
/// A successful [`connect`](Self::connect) covers the whole startup
/// sequence: open the connection under the given client identifier, open a
/// session in client-acknowledge mode, resolve the topic, and attach a
/// consumer to it.
#[async_trait]
pub trait BrokerTransport: Send + Sync + 'static {
    /// Consumer type produced by a successful connect.
    type Consumer: TopicConsumer + 'static;

    /// Connects to the broker and subscribes to the target topic.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::ConnectionFailed`] when the connection or the
    /// topic subscription cannot be established.
    async fn connect(
        &self,
        target: &BrokerTarget,
        client_id: &str,
    ) -> Result<Self::Consumer, RelayError>;
}

/// A topic consumer in client-acknowledge mode.
#[async_trait]
pub trait TopicConsumer: Send {
    /// Receives the next inbound message.
    ///
    /// # Errors
    ///
    /// An `Err` is a connection-level fault: the listener marks itself
    /// `Faulted` and enters the reconnect loop.
    async fn recv(&mut self) -> Result<InboundMessage, RelayError>;

    /// Acknowledges a message back to the broker.
    ///
    /// # Errors
    ///
    /// Returns an error when the acknowledgment cannot be transmitted.
    async fn ack(&mut self, message_id: &str) -> Result<(), RelayError>;
}
