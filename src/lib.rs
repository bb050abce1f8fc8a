//! # Tenax - a resilient, typed HTTP API client
//!
//! Tenax turns a logical request (verb, endpoint, body, headers) into a
//! completed, typed response despite transient network failures, ambiguous
//! server response shapes, and the need for per-request authentication and
//! observability. Network I/O itself lives behind the narrow
//! [`Transport`] interface; the bundled implementation is built on `reqwest`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use tenax::{ApiConfig, AuthScheme, CancellationToken, Client};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tenax::Error> {
//!     let config = ApiConfig::builder()
//!         .base_url("https://api.example.com")
//!         .api_version("v1")
//!         .timeout(Duration::from_secs(15))
//!         .max_retries(3)
//!         .retry_delay(Duration::from_millis(500))
//!         .build()?;
//!
//!     let client = Client::new(config)?;
//!     client.set_authentication("my-token", AuthScheme::Bearer);
//!
//!     let cancel = CancellationToken::new();
//!     let created = client
//!         .post::<_, User>("users", &CreateUser { name: "Alice".into() }, None, &cancel)
//!         .await?;
//!
//!     if created.success {
//!         println!("created user {:?}", created.data.map(|u| u.id));
//!     } else {
//!         eprintln!(
//!             "create failed ({}): {}",
//!             created.status_code,
//!             created.message.unwrap_or_default()
//!         );
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## How failures are surfaced
//!
//! Each failed attempt (transport error, timeout, non-2xx status, or
//! undecodable body) is retried with linear backoff (the wait before retry
//! `i` is `retry_delay * i`) until the retry budget is spent. The terminal
//! failure of an envelope operation comes back as a *failed envelope*
//! (`success == false`, a message, and the last observed status code, with
//! 500 standing in for failures that never reached the server), so ordinary
//! call sites handle one shape for both outcomes. Cancellation is the
//! exception: it always propagates as [`Error::Cancelled`], immediately and
//! without retries. [`Client::download`] has no envelope and propagates all
//! errors directly.
//!
//! ## Response decoding
//!
//! Servers that wrap payloads in the envelope convention
//! (`{"success": ..., "data": ..., ...}`) and plain REST endpoints that
//! return the payload bare are both supported without per-endpoint
//! configuration; see [`ResponseEnvelope`] for the fallback policy.
//!
//! ## Observability
//!
//! Subscribe with [`Client::on_request_completed`] (one [`RequestMetrics`]
//! per logical request, gated by the `enable_metrics` toggle) and
//! [`Client::on_request_failed`] (one [`FailureEvent`] per terminal
//! failure). Attempt-level logging goes through `tracing`, gated by
//! `enable_logging`.

mod auth;
mod client;
mod config;
mod error;
mod events;
mod executor;
mod request;
mod response;
mod service;
pub mod transport;

pub use auth::AuthScheme;
pub use client::Client;
pub use config::{ApiConfig, ApiConfigBuilder};
pub use error::{Error, Result, SENTINEL_STATUS};
pub use events::{FailureEvent, RequestMetrics};
pub use request::OutboundRequest;
pub use response::ResponseEnvelope;
pub use service::ApiService;
pub use transport::{RawResponse, ReqwestTransport, Transport};

// Re-exported so callers don't need a direct tokio-util dependency to cancel
// requests.
pub use tokio_util::sync::CancellationToken;
