//! Listener metrics.
//!
//! [`ListenerMetrics`] provides lock-free atomic counters for message and
//! reconnection statistics. All counters use `Relaxed` ordering; snapshot
//! reads are consistent enough for monitoring purposes.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for broker listener statistics.
#[derive(Debug, Default)]
pub struct ListenerMetrics {
    /// Total text messages received from the broker.
    pub messages_received: AtomicU64,
    /// Total payload bytes received (text messages only).
    pub bytes_received: AtomicU64,
    /// Total non-text messages skipped.
    pub non_text_messages: AtomicU64,
    /// Total payloads that failed to decode.
    pub decode_errors: AtomicU64,
    /// Total events delivered to the registry.
    pub events_delivered: AtomicU64,
    /// Total reconnection attempts.
    pub reconnect_count: AtomicU64,
}

impl ListenerMetrics {
    /// Creates a new metrics instance with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a received text message with the given payload size.
    pub fn record_message(&self, bytes: u64) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records a skipped non-text message.
    pub fn record_non_text(&self) {
        self.non_text_messages.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a payload that failed to decode.
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an event delivered to the registry.
    pub fn record_delivered(&self) {
        self.events_delivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a reconnection attempt.
    pub fn record_reconnect(&self) {
        self.reconnect_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time snapshot of all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            non_text_messages: self.non_text_messages.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            reconnect_count: self.reconnect_count.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of [`ListenerMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Total text messages received from the broker.
    pub messages_received: u64,
    /// Total payload bytes received.
    pub bytes_received: u64,
    /// Total non-text messages skipped.
    pub non_text_messages: u64,
    /// Total payloads that failed to decode.
    pub decode_errors: u64,
    /// Total events delivered to the registry.
    pub events_delivered: u64,
    /// Total reconnection attempts.
    pub reconnect_count: u64,
}
