//! Endpoint-grouping service wrapper.
//!
//! An [`ApiService`] prefixes every call with a base endpoint so related
//! operations can share one path root (`users`, `billing/invoices`, ...).
//! It holds its own [`Client`] handle, so services can be constructed before
//! or after the rest of the application wires itself up.

use crate::{response::ResponseEnvelope, Client, Result};
use http::HeaderMap;
use serde::{de::DeserializeOwned, Serialize};
use tokio_util::sync::CancellationToken;

/// A thin wrapper that scopes a [`Client`] to one endpoint subtree.
///
/// # Examples
///
/// ```no_run
/// use tenax::{ApiConfig, ApiService, CancellationToken, Client};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), tenax::Error> {
/// let client = Client::new(ApiConfig::default())?;
/// let users = ApiService::new(client, "users");
/// let cancel = CancellationToken::new();
///
/// // Requests <base>/<version>/users/123
/// let user = users.get::<User>("123", None, &cancel).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiService {
    client: Client,
    base_endpoint: String,
}

impl ApiService {
    /// Creates a service rooted at `base_endpoint`. An empty base leaves
    /// endpoints untouched.
    pub fn new(client: Client, base_endpoint: impl Into<String>) -> Self {
        Self {
            client,
            base_endpoint: base_endpoint.into(),
        }
    }

    /// Returns the underlying client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn resolve(&self, endpoint: &str) -> String {
        if self.base_endpoint.is_empty() {
            return endpoint.to_string();
        }
        format!(
            "{}/{}",
            self.base_endpoint.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    /// GET under the service's base endpoint.
    pub async fn get<T>(
        &self,
        endpoint: &str,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        self.client.get(&self.resolve(endpoint), headers, cancel).await
    }

    /// POST under the service's base endpoint.
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
        self.client
            .post(&self.resolve(endpoint), body, headers, cancel)
            .await
    }

    /// PUT under the service's base endpoint.
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
        self.client
            .put(&self.resolve(endpoint), body, headers, cancel)
            .await
    }

    /// DELETE under the service's base endpoint.
    pub async fn delete<T>(
        &self,
        endpoint: &str,
        headers: Option<HeaderMap>,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope<T>>
    where
        T: DeserializeOwned,
    {
        self.client
            .delete(&self.resolve(endpoint), headers, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ApiConfig;

    fn service(base: &str) -> ApiService {
        ApiService::new(Client::new(ApiConfig::default()).unwrap(), base)
    }

    #[test]
    fn resolve_joins_with_single_slash() {
        assert_eq!(service("users").resolve("123"), "users/123");
        assert_eq!(service("users/").resolve("/123"), "users/123");
    }

    #[test]
    fn empty_base_passes_endpoints_through() {
        assert_eq!(service("").resolve("health"), "health");
    }
}
