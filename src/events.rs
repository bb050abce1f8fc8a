//! Observability: per-request metrics and failure events.
//!
//! Two broadcast channels, one per event kind. Delivery is best-effort:
//! emission never blocks the executor, and slow or absent subscribers are
//! the subscribers' problem (lagging receivers observe
//! [`tokio::sync::broadcast::error::RecvError::Lagged`]).

use chrono::{DateTime, Utc};
use http::Method;
use std::time::Duration;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Summary of one logical request, emitted exactly once after the retry loop
/// terminates, never once per attempt.
#[derive(Debug, Clone)]
pub struct RequestMetrics {
    /// The resolved request URL.
    pub url: String,
    /// The HTTP method.
    pub method: Method,
    /// Wall-clock time across the whole retry loop.
    pub duration: Duration,
    /// The final status code (500 sentinel if the server was never reached).
    pub status_code: u16,
    /// Whether the request ultimately succeeded.
    pub success: bool,
    /// When the request started.
    pub timestamp: DateTime<Utc>,
    /// Attempts beyond the first.
    pub retry_count: u32,
}

/// A terminal, unrecoverable request failure.
#[derive(Debug, Clone)]
pub struct FailureEvent {
    /// Description of the failure.
    pub message: String,
    /// The last observed status code (500 sentinel if none).
    pub status_code: u16,
}

/// The client's event hub. Emission ignores send errors so subscriber state
/// can never propagate back into the executor.
pub(crate) struct EventHub {
    completed: broadcast::Sender<RequestMetrics>,
    failed: broadcast::Sender<FailureEvent>,
}

impl EventHub {
    pub(crate) fn new() -> Self {
        let (completed, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (failed, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { completed, failed }
    }

    pub(crate) fn subscribe_completed(&self) -> broadcast::Receiver<RequestMetrics> {
        self.completed.subscribe()
    }

    pub(crate) fn subscribe_failed(&self) -> broadcast::Receiver<FailureEvent> {
        self.failed.subscribe()
    }

    pub(crate) fn emit_completed(&self, metrics: RequestMetrics) {
        let _ = self.completed.send(metrics);
    }

    pub(crate) fn emit_failed(&self, event: FailureEvent) {
        let _ = self.failed.send(event);
    }
}
