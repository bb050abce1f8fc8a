//! Outbound request assembly: URL resolution and header layering.

use crate::{auth::AuthState, config::ApiConfig, Error, Result};
use bytes::Bytes;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT},
    Method,
};
use std::time::Duration;
use url::Url;

/// A fully assembled wire request, handed to the [`Transport`](crate::Transport).
///
/// Built once per call and re-sent unmodified on every retry attempt. The
/// body is re-sent as-is for all verbs, including POST; callers are assumed
/// to only issue operations that are safe to repeat.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    /// The HTTP method.
    pub method: Method,
    /// The absolute request URL.
    pub url: Url,
    /// All layered headers (defaults, auth, client, per-call).
    pub headers: HeaderMap,
    /// The request body, if any.
    pub body: Option<Bytes>,
    /// Per-attempt timeout for this request.
    pub timeout: Duration,
}

/// Resolves an endpoint against the versioned base URL.
///
/// `trim_trailing_slash(base) + "/" + trim_leading_slash(endpoint)`; an empty
/// endpoint resolves to the base URL itself.
pub(crate) fn resolve_url(full_base_url: &str, endpoint: &str) -> Result<Url> {
    let base = full_base_url.trim_end_matches('/');
    let endpoint = endpoint.trim_start_matches('/');
    let url = if endpoint.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{endpoint}")
    };
    Ok(Url::parse(&url)?)
}

/// Layers headers in fixed precedence; later layers override earlier ones on
/// key collision (header names compare case-insensitively).
///
/// 1. fixed defaults: `User-Agent`, `Accept`, and `Content-Type` when the
///    request carries a body,
/// 2. the authentication header derived from the current scheme,
/// 3. client-level default headers,
/// 4. per-call headers.
pub(crate) fn layer_headers(
    config: &ApiConfig,
    auth: &AuthState,
    client_defaults: &HeaderMap,
    per_call: Option<&HeaderMap>,
    content_type: Option<HeaderValue>,
) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let user_agent = HeaderValue::from_str(&config.effective_user_agent())
        .map_err(|e| Error::Config(format!("invalid user agent: {e}")))?;
    headers.insert(USER_AGENT, user_agent);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(content_type) = content_type {
        headers.insert(CONTENT_TYPE, content_type);
    }

    if let Some((name, value)) = auth.header() {
        headers.insert(name, value);
    }

    for (name, value) in client_defaults {
        headers.insert(name.clone(), value.clone());
    }

    if let Some(per_call) = per_call {
        for (name, value) in per_call {
            headers.insert(name.clone(), value.clone());
        }
    }

    Ok(headers)
}

/// Parses a header name/value pair supplied as strings.
pub(crate) fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|e| Error::Config(format!("invalid header name: {e}")))?;
    let value = HeaderValue::try_from(value)
        .map_err(|e| Error::Config(format!("invalid header value: {e}")))?;
    Ok((name, value))
}
