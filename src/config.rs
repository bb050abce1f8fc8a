//! Client configuration.
//!
//! [`ApiConfig`] is a plain value type: it is snapshotted once at the start
//! of each request and never mutated field-by-field from outside. Swapping
//! configuration on a live client replaces the whole object atomically and
//! only affects requests built after the swap.

use crate::{auth::AuthScheme, Error, Result};
use std::time::Duration;

const MIN_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_RETRIES_LIMIT: u32 = 10;
const MIN_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Configuration for a [`Client`](crate::Client).
///
/// # Examples
///
/// ```
/// use tenax::ApiConfig;
/// use std::time::Duration;
///
/// let config = ApiConfig::builder()
///     .base_url("https://api.example.com")
///     .api_version("v2")
///     .timeout(Duration::from_secs(15))
///     .max_retries(2)
///     .retry_delay(Duration::from_millis(500))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.full_base_url(), "https://api.example.com/v2");
/// ```
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Root URL of the API, without the version segment.
    pub base_url: String,
    /// API version segment appended to the base URL (e.g. `"v1"`).
    pub api_version: String,
    /// Credential used to seed the client's authentication state when
    /// non-empty.
    pub api_key: String,
    /// Scheme applied to `api_key` at client construction.
    pub auth_type: AuthScheme,
    /// Per-attempt request timeout. Transfer operations (upload/download)
    /// use three times this value.
    pub timeout: Duration,
    /// Number of retries after the initial attempt.
    pub max_retries: u32,
    /// Base backoff delay; the wait before retry `i` (1-indexed) is
    /// `retry_delay * i`.
    pub retry_delay: Duration,
    /// Emit `tracing` events for attempts and outcomes.
    pub enable_logging: bool,
    /// Emit one [`RequestMetrics`](crate::RequestMetrics) event per logical
    /// request.
    pub enable_metrics: bool,
    /// `User-Agent` header value; an empty string selects a generated
    /// default.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.example.com".to_string(),
            api_version: "v1".to_string(),
            api_key: String::new(),
            auth_type: AuthScheme::Bearer,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            enable_logging: true,
            enable_metrics: false,
            user_agent: String::new(),
        }
    }
}

impl ApiConfig {
    /// Creates a new [`ApiConfigBuilder`] with default settings.
    pub fn builder() -> ApiConfigBuilder {
        ApiConfigBuilder::default()
    }

    /// Returns the versioned base URL with no trailing slash:
    /// `trim_trailing_slash(base_url) + "/" + api_version`.
    ///
    /// ```
    /// use tenax::ApiConfig;
    ///
    /// let config = ApiConfig {
    ///     base_url: "https://x.com/".to_string(),
    ///     api_version: "v1".to_string(),
    ///     ..ApiConfig::default()
    /// };
    /// assert_eq!(config.full_base_url(), "https://x.com/v1");
    /// ```
    pub fn full_base_url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.api_version)
    }

    /// Returns the configured `User-Agent`, or a generated default when the
    /// configured value is blank.
    pub fn effective_user_agent(&self) -> String {
        if self.user_agent.is_empty() {
            format!(
                "tenax/{} ({})",
                env!("CARGO_PKG_VERSION"),
                std::env::consts::OS
            )
        } else {
            self.user_agent.clone()
        }
    }

    /// Checks that every setting is within its recognized range.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("base_url must not be empty".to_string()));
        }
        if self.timeout < MIN_TIMEOUT || self.timeout > MAX_TIMEOUT {
            return Err(Error::Config(format!(
                "timeout must be between {:?} and {:?}, got {:?}",
                MIN_TIMEOUT, MAX_TIMEOUT, self.timeout
            )));
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::Config(format!(
                "max_retries must be at most {}, got {}",
                MAX_RETRIES_LIMIT, self.max_retries
            )));
        }
        if self.retry_delay < MIN_RETRY_DELAY || self.retry_delay > MAX_RETRY_DELAY {
            return Err(Error::Config(format!(
                "retry_delay must be between {:?} and {:?}, got {:?}",
                MIN_RETRY_DELAY, MAX_RETRY_DELAY, self.retry_delay
            )));
        }
        Ok(())
    }
}

/// Builder for [`ApiConfig`].
///
/// Every setter replaces the default value; [`build`](Self::build) validates
/// the result.
#[derive(Debug, Default)]
pub struct ApiConfigBuilder {
    config: ApiConfig,
}

impl ApiConfigBuilder {
    /// Sets the root URL of the API.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Sets the API version segment.
    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.config.api_version = api_version.into();
        self
    }

    /// Sets the API key used to seed authentication.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = api_key.into();
        self
    }

    /// Sets the scheme applied to the API key.
    pub fn auth_type(mut self, auth_type: AuthScheme) -> Self {
        self.config.auth_type = auth_type;
        self
    }

    /// Sets the per-attempt timeout (5–120 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Sets the number of retries after the initial attempt (0–10).
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.max_retries = max_retries;
        self
    }

    /// Sets the base backoff delay (100 ms – 5 s).
    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.config.retry_delay = retry_delay;
        self
    }

    /// Enables or disables request logging.
    pub fn enable_logging(mut self, enable: bool) -> Self {
        self.config.enable_logging = enable;
        self
    }

    /// Enables or disables per-request metrics events.
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.config.enable_metrics = enable;
        self
    }

    /// Sets the `User-Agent` header value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Validates and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any setting is outside its recognized
    /// range.
    pub fn build(self) -> Result<ApiConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
