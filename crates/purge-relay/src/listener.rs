//! Broker listener: connection lifecycle and message handling.
//!
//! [`BrokerListener`] owns the broker connection, receives raw messages on
//! a spawned reader task, drives decode → normalize → fan-out, and
//! supervises reconnection after connection-level faults. It is designed to
//! be held as a single long-lived instance for the lifetime of the process.
//!
//! # Delivery Guarantees
//!
//! Every handled message is acknowledged exactly once: after successful
//! delivery, after a decode failure, and after a non-text skip alike. The
//! listener never requeues; ordering across reconnects is not guaranteed.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RelayConfig;
use crate::decoder::EventDecoder;
use crate::error::{RelayError, RelayResult};
use crate::key::normalize_key;
use crate::metrics::{ListenerMetrics, MetricsSnapshot};
use crate::reconnect::ReconnectPolicy;
use crate::registry::{InvalidationSubscriber, SubscriptionHandle, SubscriptionRegistry};
use crate::transport::{BrokerTarget, BrokerTransport, InboundMessage, MessageBody, TopicConsumer};

/// Lifecycle state of the broker connection.
///
/// Not persisted; rebuilt on every (re)connect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection; the initial state and the state after `close()`.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// Connected and subscribed to the topic.
    Connected,
    /// The transport reported a connection-level fault; reconnecting.
    Faulted,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Faulted => "Faulted",
        };
        f.write_str(s)
    }
}

/// Resilient subscriber bridging a broker topic to local subscribers.
pub struct BrokerListener<T: BrokerTransport> {
    /// Connection factory for the broker.
    transport: Arc<T>,
    /// Relay configuration.
    config: RelayConfig,
    /// Injected payload decoder.
    decoder: EventDecoder,
    /// Subscriber registry fed by the reader task.
    registry: Arc<SubscriptionRegistry>,
    /// Shared connection state, updated by the reader task.
    state: Arc<Mutex<ConnectionState>>,
    /// Message and reconnection counters.
    metrics: Arc<ListenerMetrics>,
    /// Shutdown signal for the reader task.
    shutdown_tx: Option<watch::Sender<bool>>,
    /// Handle to the spawned reader task.
    reader_handle: Option<tokio::task::JoinHandle<()>>,
}

impl<T: BrokerTransport> BrokerListener<T> {
    /// Creates a new listener. No connection is made until [`start`](Self::start).
    #[must_use]
    pub fn new(transport: T, config: RelayConfig, decoder: EventDecoder) -> Self {
        Self {
            transport: Arc::new(transport),
            config,
            decoder,
            registry: Arc::new(SubscriptionRegistry::new()),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            metrics: Arc::new(ListenerMetrics::new()),
            shutdown_tx: None,
            reader_handle: None,
        }
    }

    /// Returns the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Returns the subscriber registry.
    #[must_use]
    pub fn registry(&self) -> Arc<SubscriptionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Returns a snapshot of the listener metrics.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Registers a subscriber for the invalidation feed.
    pub fn subscribe(&self, subscriber: Arc<dyn InvalidationSubscriber>) -> SubscriptionHandle {
        self.registry.subscribe(subscriber)
    }

    /// Removes a subscriber. No-op when it was never (or already) removed.
    pub fn unsubscribe(&self, subscriber: &Arc<dyn InvalidationSubscriber>) {
        self.registry.unsubscribe(subscriber);
    }

    /// Performs a single connect attempt and, on success, spawns the reader
    /// task.
    ///
    /// A connection-establishment failure is logged as a warning and leaves
    /// the listener `Disconnected`; it is not surfaced to the caller and is
    /// not retried (only post-startup faults drive the reconnect policy).
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidState`] when the listener was already
    /// started, and configuration errors from target resolution.
    pub async fn start(&mut self) -> RelayResult<()> {
        if self.reader_handle.is_some() {
            return Err(RelayError::InvalidState {
                expected: ConnectionState::Disconnected.to_string(),
                actual: self.state().to_string(),
            });
        }

        let target = self.config.broker_target()?;
        let client_id = next_client_id(&self.config.client_id_prefix);
        set_state(&self.state, ConnectionState::Connecting);
        debug!(url = %target.url, topic = %target.topic, client_id = %client_id, "connecting to broker");

        match self.transport.connect(&target, &client_id).await {
            Ok(consumer) => {
                set_state(&self.state, ConnectionState::Connected);
                info!(url = %target.url, topic = %target.topic, "connected to broker");

                let (shutdown_tx, shutdown_rx) = watch::channel(false);
                self.shutdown_tx = Some(shutdown_tx);
                self.reader_handle = Some(self.spawn_reader(consumer, target, shutdown_rx));
                Ok(())
            }
            Err(e) => {
                warn!(url = %target.url, error = %e, "unable to connect to broker");
                set_state(&self.state, ConnectionState::Disconnected);
                Ok(())
            }
        }
    }

    /// Stops the reader task and tears down the connection.
    ///
    /// Signals shutdown and waits up to five seconds for the reader task to
    /// exit; the consumer is dropped with it.
    pub async fn close(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.reader_handle.take() {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), handle).await;
        }
        set_state(&self.state, ConnectionState::Disconnected);
        info!("broker listener closed");
    }

    /// Spawns the reader task: a message loop over the consumer plus a
    /// reconnect loop driven by the configured policy.
    fn spawn_reader(
        &self,
        consumer: T::Consumer,
        target: BrokerTarget,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let transport = Arc::clone(&self.transport);
        let decoder = self.decoder;
        let registry = Arc::clone(&self.registry);
        let metrics = Arc::clone(&self.metrics);
        let state = Arc::clone(&self.state);
        let client_id_prefix = self.config.client_id_prefix.clone();
        let reconnect = self.config.reconnect.clone();

        tokio::spawn(async move {
            let mut policy = ReconnectPolicy::new(reconnect);
            let mut current = consumer;

            'outer: loop {
                // Message loop until a connection-level fault or shutdown.
                let fault = loop {
                    tokio::select! {
                        msg = current.recv() => match msg {
                            Ok(msg) => {
                                if let Err(e) =
                                    handle_message(&mut current, msg, &decoder, &registry, &metrics)
                                        .await
                                {
                                    break Some(e);
                                }
                            }
                            Err(e) => break Some(e),
                        },
                        _ = shutdown_rx.changed() => break None,
                    }
                };

                let Some(fault) = fault else {
                    debug!("shutdown signal received in reader");
                    break 'outer;
                };

                error!(error = %fault, "broker connection fault");
                set_state(&state, ConnectionState::Faulted);

                // Reconnect loop: same connect sequence as `start()`, fresh
                // client id per attempt, until success or shutdown.
                loop {
                    if *shutdown_rx.borrow() {
                        break 'outer;
                    }
                    let Some(delay) = policy.next_backoff() else {
                        warn!("reconnect disabled or retries exhausted, stopping listener");
                        break 'outer;
                    };
                    tokio::select! {
                        () = tokio::time::sleep(delay) => {}
                        _ = shutdown_rx.changed() => break 'outer,
                    }

                    set_state(&state, ConnectionState::Connecting);
                    metrics.record_reconnect();
                    let client_id = next_client_id(&client_id_prefix);
                    match transport.connect(&target, &client_id).await {
                        Ok(consumer) => {
                            policy.reset();
                            set_state(&state, ConnectionState::Connected);
                            info!(url = %target.url, topic = %target.topic, "reconnected to broker");
                            current = consumer;
                            continue 'outer;
                        }
                        Err(e) => {
                            warn!(attempt = policy.attempt(), error = %e, "reconnect attempt failed");
                            set_state(&state, ConnectionState::Faulted);
                        }
                    }
                }
            }

            set_state(&state, ConnectionState::Disconnected);
            debug!("reader task exited");
        })
    }
}

impl<T: BrokerTransport> std::fmt::Debug for BrokerListener<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerListener")
            .field("state", &self.state())
            .field("topic", &self.config.topic)
            .field("subscribers", &self.registry.len())
            .finish_non_exhaustive()
    }
}

/// Generates a fresh unique client identifier for one connect attempt.
fn next_client_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Handles one inbound message: decode, normalize, fan out, acknowledge.
///
/// The message is acknowledged on every path (success, decode failure, and
/// non-text skip). An `Err` from this function is an acknowledgment-channel
/// fault, which the caller treats as a connection-level fault.
async fn handle_message<C: TopicConsumer>(
    consumer: &mut C,
    msg: InboundMessage,
    decoder: &EventDecoder,
    registry: &SubscriptionRegistry,
    metrics: &ListenerMetrics,
) -> RelayResult<()> {
    let id = msg.id;
    match msg.body {
        MessageBody::Binary(_) => {
            let err = RelayError::NonTextMessage { id: id.clone() };
            warn!(error = %err, "skipping non-text message");
            metrics.record_non_text();
        }
        MessageBody::Text(text) => {
            metrics.record_message(text.len() as u64);
            debug!(message_id = %id, "received text message");

            match decoder.decode(&text) {
                Ok(mut event) => {
                    event.key = normalize_key(&event.key);
                    registry.publish(&event);
                    metrics.record_delivered();
                }
                Err(e) => {
                    error!(message_id = %id, error = %e, "error in invalidation delivery");
                    metrics.record_decode_error();
                    registry.publish_error(&e);
                }
            }
        }
    }

    if let Err(e) = consumer.ack(&id).await {
        return Err(RelayError::Acknowledge(e.to_string()));
    }
    debug!(message_id = %id, "acknowledged message");
    Ok(())
}

/// Updates the shared connection state.
fn set_state(state: &Mutex<ConnectionState>, next: ConnectionState) {
    *state.lock() = next;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_display() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(ConnectionState::Connected.to_string(), "Connected");
        assert_eq!(ConnectionState::Faulted.to_string(), "Faulted");
    }

    #[test]
    fn test_next_client_id_unique() {
        let a = next_client_id("purge-relay");
        let b = next_client_id("purge-relay");
        assert!(a.starts_with("purge-relay-"));
        assert_ne!(a, b);
    }
}
