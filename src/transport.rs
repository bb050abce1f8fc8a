//! The transport port: the boundary to whatever performs actual network I/O.
//!
//! The executor drives retries against this interface and never touches
//! sockets, TLS, or DNS itself. Any conforming implementation works; the
//! bundled [`ReqwestTransport`] is the default. Implementations must be safe
//! for concurrent use by multiple simultaneous requests.

use crate::{request::OutboundRequest, Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// A raw wire response: whatever the server sent, undecoded.
///
/// A transport returns `Ok` for any exchange that produced a status code,
/// success or not; classification of non-2xx responses is the executor's job.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The response headers.
    pub headers: HeaderMap,
    /// The raw response body.
    pub body: Bytes,
}

/// Sends a single wire request and returns the raw response.
///
/// # Errors
///
/// Implementations return [`Error::Timeout`] when the request exceeds the
/// timeout carried by the [`OutboundRequest`], and [`Error::Transport`] for
/// connectivity failures that never produced a status code.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs one request attempt.
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse>;
}

/// The default [`Transport`] backed by a pooled [`reqwest::Client`].
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a freshly built connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl From<reqwest::Client> for ReqwestTransport {
    fn from(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: OutboundRequest) -> Result<RawResponse> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .timeout(request.timeout)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Transport {
            message: error.to_string(),
        }
    }
}
