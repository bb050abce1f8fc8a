//! The retry executor: the core request state machine.
//!
//! One logical request is one call to [`Executor::run`]: attempts are
//! strictly sequential, each failed attempt is followed by a linear backoff
//! sleep (`retry_delay * (attempt + 1)`), and the cancellation token is
//! honored at loop entry, around the transport call, and during the sleep.
//! Decoding happens inside the attempt, so a malformed body is retried like
//! any other failure.
//!
//! Linear (not exponential) backoff bounded by a small retry budget is a
//! deliberate choice: this loop is meant to ride out brief server hiccups,
//! not sustained outages.

use crate::{
    config::ApiConfig,
    error::SENTINEL_STATUS,
    events::{EventHub, FailureEvent, RequestMetrics},
    request::OutboundRequest,
    transport::{RawResponse, Transport},
    Error, Result,
};
use chrono::Utc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Drives one logical request against the transport, borrowing the
/// configuration snapshot and event hub from the client for the duration of
/// the call.
pub(crate) struct Executor<'a> {
    transport: &'a dyn Transport,
    config: &'a ApiConfig,
    events: &'a EventHub,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(
        transport: &'a dyn Transport,
        config: &'a ApiConfig,
        events: &'a EventHub,
    ) -> Self {
        Self {
            transport,
            config,
            events,
        }
    }

    /// Runs the retry loop, decoding each successful attempt with `decode`.
    ///
    /// Returns the decoded value, or the classified terminal error once the
    /// retry budget is exhausted. Emits one metrics event per logical request
    /// (when metrics are enabled) and one failure event per terminal error.
    pub(crate) async fn run<T, F>(
        &self,
        request: &OutboundRequest,
        cancel: &CancellationToken,
        decode: F,
    ) -> Result<T>
    where
        F: Fn(&RawResponse) -> Result<T>,
    {
        let started = Instant::now();
        let started_at = Utc::now();
        let mut attempt: u32 = 0;

        let outcome = loop {
            if cancel.is_cancelled() {
                break Err(Error::Cancelled);
            }

            match self.attempt(request, cancel, &decode).await {
                Ok(success) => break Ok(success),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_delay * (attempt + 1);
                    if self.config.enable_logging {
                        tracing::warn!(
                            error = %err,
                            attempt = attempt + 1,
                            max_retries = self.config.max_retries,
                            delay_ms = delay.as_millis() as u64,
                            method = %request.method,
                            url = %request.url,
                            "request failed, retrying"
                        );
                    }
                    tokio::select! {
                        _ = cancel.cancelled() => break Err(Error::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(err) => break Err(err),
            }
        };

        let duration = started.elapsed();

        match outcome {
            Ok((value, status_code)) => {
                if self.config.enable_logging {
                    tracing::info!(
                        method = %request.method,
                        url = %request.url,
                        status = status_code,
                        attempts = attempt + 1,
                        latency_ms = duration.as_millis() as u64,
                        "request completed"
                    );
                }
                if self.config.enable_metrics {
                    self.events.emit_completed(RequestMetrics {
                        url: request.url.to_string(),
                        method: request.method.clone(),
                        duration,
                        status_code,
                        success: true,
                        timestamp: started_at,
                        retry_count: attempt,
                    });
                }
                Ok(value)
            }
            Err(Error::Cancelled) => {
                if self.config.enable_logging {
                    tracing::debug!(
                        method = %request.method,
                        url = %request.url,
                        "request cancelled"
                    );
                }
                // Cancellation aborts the loop; there is no completed
                // request to describe, so only the failure channel fires.
                self.events.emit_failed(FailureEvent {
                    message: Error::Cancelled.to_string(),
                    status_code: SENTINEL_STATUS,
                });
                Err(Error::Cancelled)
            }
            Err(err) => {
                let status_code = err.status_or_sentinel();
                if self.config.enable_logging {
                    tracing::error!(
                        error = %err,
                        method = %request.method,
                        url = %request.url,
                        attempts = attempt + 1,
                        "request failed after all retries"
                    );
                }
                if self.config.enable_metrics {
                    self.events.emit_completed(RequestMetrics {
                        url: request.url.to_string(),
                        method: request.method.clone(),
                        duration,
                        status_code,
                        success: false,
                        timestamp: started_at,
                        retry_count: attempt,
                    });
                }
                self.events.emit_failed(FailureEvent {
                    message: err.to_string(),
                    status_code,
                });
                Err(err)
            }
        }
    }

    /// Executes one attempt: send, classify the status, decode.
    async fn attempt<T, F>(
        &self,
        request: &OutboundRequest,
        cancel: &CancellationToken,
        decode: &F,
    ) -> Result<(T, u16)>
    where
        F: Fn(&RawResponse) -> Result<T>,
    {
        // Each attempt re-sends the identical request, body included.
        let outbound = request.clone();

        if self.config.enable_logging {
            tracing::debug!(
                method = %outbound.method,
                url = %outbound.url,
                "executing HTTP request"
            );
        }

        let raw = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = self.transport.send(outbound) => result?,
        };

        if !raw.status.is_success() {
            return Err(Error::Http {
                status: raw.status,
                raw_response: String::from_utf8_lossy(&raw.body).into_owned(),
            });
        }

        let status_code = raw.status.as_u16();
        let value = decode(&raw)?;
        Ok((value, status_code))
    }
}
