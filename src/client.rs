//! The client facade: one method per verb, plus auth/header/config mutation.
//!
//! [`Client`] ties the configuration snapshot, authentication state, retry
//! executor, and decoder together. It is cheap to clone and safe to share:
//! concurrent calls each own their retry loop state, and configuration or
//! auth changes are last-writer-wins snapshots that only affect requests
//! built after the change.

use crate::{
    auth::{AuthScheme, AuthState},
    config::ApiConfig,
    events::{EventHub, FailureEvent, RequestMetrics},
    executor::Executor,
    request::{layer_headers, parse_header, resolve_url, OutboundRequest},
    response::{decode_text, decode_typed, ResponseEnvelope},
    transport::{ReqwestTransport, Transport},
    Error, Result,
};
use bytes::Bytes;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    Method,
};
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Upload and download requests get three times the configured timeout.
const TRANSFER_TIMEOUT_MULTIPLIER: u32 = 3;

/// A resilient, typed HTTP API client.
///
/// Terminal failures of envelope operations come back as failed envelopes
/// (`success == false` with a message and the last observed status code);
/// only cancellation and request-build problems are returned as `Err`.
/// [`download`](Client::download) is the exception: with no envelope to
/// populate, its errors propagate directly.
///
/// # Examples
///
/// ```no_run
/// use tenax::{ApiConfig, CancellationToken, Client};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Health {
///     ok: bool,
/// }
///
/// # async fn example() -> Result<(), tenax::Error> {
/// let config = ApiConfig::builder()
///     .base_url("https://api.example.com")
///     .api_version("v1")
///     .max_retries(2)
///     .build()?;
/// let client = Client::new(config)?;
/// let cancel = CancellationToken::new();
///
/// let health = client.get::<Health>("health", None, &cancel).await?;
/// if health.success {
///     println!("ok: {}", health.data.map(|h| h.ok).unwrap_or(false));
/// } else {
///     eprintln!(
///         "health check failed ({}): {}",
///         health.status_code,
///         health.message.unwrap_or_default()
///     );
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    config: RwLock<ApiConfig>,
    auth: RwLock<AuthState>,
    default_headers: RwLock<HeaderMap>,
    events: EventHub,
}

impl Client {
    /// Creates a client over the bundled reqwest transport.
    ///
    /// A non-empty `api_key` in the configuration seeds the authentication
    /// state with the configured scheme.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is out of range or the
    /// transport cannot be constructed.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Creates a client over a caller-supplied [`Transport`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is out of range.
    pub fn with_transport(config: ApiConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let mut auth = AuthState::default();
        if !config.api_key.is_empty() {
            auth.set(config.api_key.clone(), config.auth_type);
        }

        Ok(Self {
            inner: Arc::new(ClientInner {
                transport,
                config: RwLock::new(config),
                auth: RwLock::new(auth),
                default_headers: RwLock::new(HeaderMap::new()),
                events: EventHub::new(),
            }),
        })
    }

    /// Makes a GET request and decodes the response envelope.
    pub async fn get<T>(
        &self,
        endpoint: &str,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        self.request_envelope(Method::GET, endpoint, None, None, headers, cancel)
            .await
    }

    /// Makes a POST request with a JSON body and decodes the response
    /// envelope.
    pub async fn post<Req, T>(
        &self,
        endpoint: &str,
        body: &Req,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<T>>
    where
        Req: Serialize,
        T: DeserializeOwned,
    {
        let body = encode_json(body)?;
        self.request_envelope(
            Method::POST,
            endpoint,
            Some(body),
            json_content_type(),
            headers,
            cancel,
        )
        .await
    }

    /// Makes a PUT request with a JSON body and decodes the response
    /// envelope.
    pub async fn put<Req, T>(
        &self,
        endpoint: &str,
        body: &Req,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<T>>
    where
        Req: Serialize,
        T: DeserializeOwned,
    {
        let body = encode_json(body)?;
        self.request_envelope(
            Method::PUT,
            endpoint,
            Some(body),
            json_content_type(),
            headers,
            cancel,
        )
        .await
    }

    /// Makes a DELETE request and decodes the response envelope.
    pub async fn delete<T>(
        &self,
        endpoint: &str,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        self.request_envelope(Method::DELETE, endpoint, None, None, headers, cancel)
            .await
    }

    /// Makes a GET request and returns the body as raw text, bypassing
    /// structured parsing entirely.
    pub async fn get_text(
        &self,
        endpoint: &str,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<String>> {
        let config = self.config_snapshot();
        let request =
            self.build_request(&config, Method::GET, endpoint, None, None, headers.as_ref(), 1)?;
        self.run_text(&config, request, cancel).await
    }

    /// Uploads a file as `multipart/form-data` (single part named `file`).
    ///
    /// Uses three times the configured timeout and returns the response body
    /// as text. `content_type` defaults to `application/octet-stream`.
    pub async fn upload(
        &self,
        endpoint: &str,
        data: &[u8],
        file_name: &str,
        content_type: Option<&str>,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<String>> {
        let part_type = content_type.unwrap_or("application/octet-stream");
        let (multipart_type, body) = multipart_file(data, file_name, part_type)?;

        let config = self.config_snapshot();
        let request = self.build_request(
            &config,
            Method::POST,
            endpoint,
            Some(body),
            Some(multipart_type),
            headers.as_ref(),
            TRANSFER_TIMEOUT_MULTIPLIER,
        )?;
        self.run_text(&config, request, cancel).await
    }

    /// Downloads raw bytes, bypassing envelope decoding.
    ///
    /// Uses three times the configured timeout. Unlike the envelope verbs,
    /// terminal failures propagate as `Err`: there is no envelope to
    /// populate.
    pub async fn download(
        &self,
        endpoint: &str,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<Bytes> {
        let config = self.config_snapshot();
        let request = self.build_request(
            &config,
            Method::GET,
            endpoint,
            None,
            None,
            headers.as_ref(),
            TRANSFER_TIMEOUT_MULTIPLIER,
        )?;

        let executor = Executor::new(self.inner.transport.as_ref(), &config, &self.inner.events);
        executor
            .run(&request, cancel, |raw| Ok(raw.body.clone()))
            .await
    }

    /// Replaces the credential used for requests built from now on.
    pub fn set_authentication(&self, token: impl Into<String>, scheme: AuthScheme) {
        write_lock(&self.inner.auth).set(token, scheme);
    }

    /// Clears the credential; subsequent requests carry no auth header.
    pub fn clear_authentication(&self) {
        write_lock(&self.inner.auth).clear();
    }

    /// Adds a client-level default header, included in every request until
    /// removed. Overrides the fixed defaults and the auth header on
    /// collision; per-call headers still win.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the name or value is invalid.
    pub fn add_default_header(&self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        write_lock(&self.inner.default_headers).insert(name, value);
        Ok(())
    }

    /// Removes a client-level default header. Unknown names are ignored.
    pub fn remove_default_header(&self, name: &str) {
        if let Ok(name) = HeaderName::try_from(name) {
            write_lock(&self.inner.default_headers).remove(name);
        }
    }

    /// Atomically replaces the whole configuration.
    ///
    /// In-flight requests keep the snapshot they already read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the new configuration is out of range;
    /// the previous configuration stays in place.
    pub fn update_configuration(&self, config: ApiConfig) -> Result<()> {
        config.validate()?;
        *write_lock(&self.inner.config) = config;
        Ok(())
    }

    /// Returns a copy of the current configuration.
    pub fn configuration(&self) -> ApiConfig {
        self.config_snapshot()
    }

    /// Subscribes to per-request metrics events.
    ///
    /// One event fires per logical request after its retry loop terminates,
    /// success or failure, provided metrics are enabled in the
    /// configuration. Delivery is best-effort and unordered across
    /// concurrent requests.
    pub fn on_request_completed(&self) -> broadcast::Receiver<RequestMetrics> {
        self.inner.events.subscribe_completed()
    }

    /// Subscribes to terminal-failure events. Independent of the metrics
    /// toggle.
    pub fn on_request_failed(&self) -> broadcast::Receiver<FailureEvent> {
        self.inner.events.subscribe_failed()
    }

    fn config_snapshot(&self) -> ApiConfig {
        read_lock(&self.inner.config).clone()
    }

    fn build_request(
        &self,
        config: &ApiConfig,
        method: Method,
        endpoint: &str,
        body: Option<Bytes>,
        content_type: Option<HeaderValue>,
        per_call: Option<&HeaderMap>,
        timeout_multiplier: u32,
    ) -> Result<OutboundRequest> {
        let url = resolve_url(&config.full_base_url(), endpoint)?;
        let auth = read_lock(&self.inner.auth).clone();
        let defaults = read_lock(&self.inner.default_headers).clone();
        let headers = layer_headers(config, &auth, &defaults, per_call, content_type)?;

        Ok(OutboundRequest {
            method,
            url,
            headers,
            body,
            timeout: config.timeout * timeout_multiplier,
        })
    }

    async fn request_envelope<T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Bytes>,
        content_type: Option<HeaderValue>,
        per_call: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        let config = self.config_snapshot();
        let request = self.build_request(
            &config,
            method,
            endpoint,
            body,
            content_type,
            per_call.as_ref(),
            1,
        )?;

        let executor = Executor::new(self.inner.transport.as_ref(), &config, &self.inner.events);
        let outcome = executor
            .run(&request, cancel, |raw| decode_typed::<T>(&raw.body, raw.status))
            .await;

        envelope_outcome(outcome)
    }

    async fn run_text(
        &self,
        config: &ApiConfig,
        request: OutboundRequest,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<String>> {
        let executor = Executor::new(self.inner.transport.as_ref(), config, &self.inner.events);
        let outcome = executor
            .run(&request, cancel, |raw| Ok(decode_text(&raw.body, raw.status)))
            .await;

        envelope_outcome(outcome)
    }
}

/// Converts a terminal executor outcome into the caller-visible contract:
/// success envelopes pass through, terminal errors become failed envelopes,
/// and cancellation propagates untouched.
fn envelope_outcome<T>(outcome: Result<ResponseEnvelope<T>>) -> Result<ResponseEnvelope<T>> {
    match outcome {
        Ok(envelope) => Ok(envelope),
        Err(Error::Cancelled) => Err(Error::Cancelled),
        Err(err) => Ok(ResponseEnvelope::failure(
            err.to_string(),
            err.status_or_sentinel(),
        )),
    }
}

fn encode_json<Req: Serialize>(body: &Req) -> Result<Bytes> {
    let bytes = serde_json::to_vec(body).map_err(|e| Error::Serialization(e.to_string()))?;
    Ok(Bytes::from(bytes))
}

fn json_content_type() -> Option<HeaderValue> {
    Some(HeaderValue::from_static("application/json"))
}

/// Encodes a single-file `multipart/form-data` body with a random boundary.
fn multipart_file(
    data: &[u8],
    file_name: &str,
    content_type: &str,
) -> Result<(HeaderValue, Bytes)> {
    let boundary = format!("tenax-{:016x}", rand::thread_rng().gen::<u64>());

    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let header = HeaderValue::from_str(&format!("multipart/form-data; boundary={boundary}"))
        .map_err(|e| Error::Config(format!("invalid multipart boundary: {e}")))?;
    Ok((header, Bytes::from(body)))
}

fn read_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
