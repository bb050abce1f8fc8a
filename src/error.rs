//! Error types for HTTP API calls.
//!
//! The taxonomy follows the request lifecycle: [`Error::Transport`] and
//! [`Error::Timeout`] cover failures before any status code exists,
//! [`Error::Http`] carries a non-success status from the server, and
//! [`Error::Decode`] preserves the raw body when neither the envelope shape
//! nor the bare payload could be parsed. All of those are retried by the
//! executor; [`Error::Cancelled`] never is.

use http::StatusCode;

/// Status code reported for failures that never reached the server.
pub const SENTINEL_STATUS: u16 = 500;

/// The main error type for HTTP API calls.
///
/// # Examples
///
/// ```no_run
/// use tenax::{ApiConfig, CancellationToken, Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new(ApiConfig::default())?;
/// let cancel = CancellationToken::new();
///
/// match client.download("reports/latest.pdf", None, &cancel).await {
///     Ok(bytes) => println!("downloaded {} bytes", bytes.len()),
///     Err(Error::Http { status, raw_response }) => {
///         eprintln!("server rejected the download ({status}): {raw_response}");
///     }
///     Err(e) => eprintln!("download failed: {e}"),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level failure (connection refused, DNS lookup failed, etc.)
    /// that occurred before any HTTP status code was observed.
    #[error("transport error: {message}")]
    Transport {
        /// Description of the underlying transport failure.
        message: String,
    },

    /// The request took longer than the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The server returned a non-success (non-2xx) status code.
    #[error("HTTP error {status}: {raw_response}")]
    Http {
        /// The HTTP status code.
        status: StatusCode,
        /// The raw response body.
        raw_response: String,
    },

    /// The response body could not be parsed as the envelope shape or as the
    /// bare target type.
    ///
    /// Both the raw body and the serde error message are preserved so the
    /// mismatch can be debugged in production.
    #[error("failed to decode response (status {status}): {serde_error}")]
    Decode {
        /// The raw response body that failed to parse.
        raw_response: String,
        /// The serde error from the bare-payload fallback parse.
        serde_error: String,
        /// The HTTP status code of the response.
        status: StatusCode,
    },

    /// The caller cancelled the request.
    ///
    /// Cancellation is never retried and never surfaced as a failed envelope.
    #[error("request cancelled")]
    Cancelled,

    /// Invalid client or request configuration (out-of-range setting, invalid
    /// header name or value, etc.).
    #[error("configuration error: {0}")]
    Config(String),

    /// An invalid URL was produced from the base URL and endpoint.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The request body could not be serialized to JSON.
    #[error("failed to serialize request body: {0}")]
    Serialization(String),
}

impl Error {
    /// Returns `true` if this error is retryable.
    ///
    /// Transport failures, timeouts, non-success status codes, and decode
    /// failures are all retried up to the configured retry budget. Note that
    /// this deliberately includes 4xx responses: the retry loop treats every
    /// failed attempt alike and relies on a small `max_retries` to bound the
    /// damage.
    ///
    /// # Examples
    ///
    /// ```
    /// use tenax::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::Http {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     raw_response: "try later".to_string(),
    /// };
    /// assert!(err.is_retryable());
    ///
    /// assert!(!Error::Cancelled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } => true,
            Error::Timeout => true,
            Error::Http { .. } => true,
            Error::Decode { .. } => true,
            Error::Cancelled => false,
            Error::Config(_) => false,
            Error::InvalidUrl(_) => false,
            Error::Serialization(_) => false,
        }
    }

    /// Returns the HTTP status code if this error observed one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Http { status, .. } => Some(*status),
            Error::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the observed status code, or [`SENTINEL_STATUS`] for failures
    /// that never produced one.
    pub fn status_or_sentinel(&self) -> u16 {
        self.status().map(|s| s.as_u16()).unwrap_or(SENTINEL_STATUS)
    }

    /// Returns the raw response body if this error carries one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Http { raw_response, .. } => Some(raw_response),
            Error::Decode { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for HTTP API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_are_retryable_too() {
        let err = Error::Http {
            status: StatusCode::NOT_FOUND,
            raw_response: "missing".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status_or_sentinel(), 404);
    }

    #[test]
    fn transport_failures_use_the_sentinel_status() {
        let err = Error::Transport {
            message: "connection refused".to_string(),
        };
        assert!(err.is_retryable());
        assert_eq!(err.status(), None);
        assert_eq!(err.status_or_sentinel(), 500);
    }

    #[test]
    fn cancellation_is_terminal() {
        assert!(!Error::Cancelled.is_retryable());
        assert_eq!(Error::Cancelled.status_or_sentinel(), 500);
    }

    #[test]
    fn decode_preserves_raw_body() {
        let err = Error::Decode {
            raw_response: "<html>".to_string(),
            serde_error: "expected value".to_string(),
            status: StatusCode::OK,
        };
        assert!(err.is_retryable());
        assert_eq!(err.raw_response(), Some("<html>"));
        assert_eq!(err.status_or_sentinel(), 200);
    }
}
