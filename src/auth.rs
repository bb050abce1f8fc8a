//! Authentication state shared by all requests issued through one client.

use http::header::{HeaderName, HeaderValue, AUTHORIZATION};

static X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// The authentication scheme applied to outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthScheme {
    /// No authentication header is sent.
    #[default]
    None,
    /// `Authorization: Bearer <token>`.
    Bearer,
    /// `X-API-Key: <token>`.
    ApiKey,
    /// Reserved; currently sends no header.
    Basic,
}

/// The current credential and scheme.
///
/// Owned by the client and read at request-build time; changing it affects
/// only requests built afterwards, never requests already in flight.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    token: Option<String>,
    scheme: AuthScheme,
}

impl AuthState {
    /// Replaces the credential. Any non-empty string is accepted; no format
    /// validation is performed.
    pub fn set(&mut self, token: impl Into<String>, scheme: AuthScheme) {
        self.token = Some(token.into());
        self.scheme = scheme;
    }

    /// Clears the credential and resets the scheme to [`AuthScheme::None`].
    pub fn clear(&mut self) {
        self.token = None;
        self.scheme = AuthScheme::None;
    }

    /// Derives the authentication header for the current state, if any.
    ///
    /// `Basic` is reserved and, like `None`, contributes no header. Tokens
    /// that are not valid header values are skipped rather than failing the
    /// request.
    pub fn header(&self) -> Option<(HeaderName, HeaderValue)> {
        let token = self.token.as_deref().filter(|t| !t.is_empty())?;
        match self.scheme {
            AuthScheme::Bearer => {
                let value = HeaderValue::from_str(&format!("Bearer {token}")).ok()?;
                Some((AUTHORIZATION, value))
            }
            AuthScheme::ApiKey => {
                let value = HeaderValue::from_str(token).ok()?;
                Some((X_API_KEY.clone(), value))
            }
            AuthScheme::None | AuthScheme::Basic => None,
        }
    }
}
