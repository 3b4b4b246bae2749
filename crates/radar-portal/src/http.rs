//! HTTP access to the Management Portal list endpoints.

use radar_cache::FetchError;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::PortalConfig;
use crate::error::PortalError;

/// Thin HTTP client for the portal's list endpoints.
///
/// Every request carries the configured timeout, so a hanging portal shows up
/// as a [`FetchError::Network`] rather than a stuck cache refresh.
pub struct PortalHttp {
    http: reqwest::Client,
    base_url: Url,
    access_token: Option<String>,
}

impl PortalHttp {
    /// Create a client for the configured portal.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &PortalConfig) -> Result<Self, PortalError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PortalError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: with_trailing_slash(config.url.clone()),
            access_token: config.access_token.clone(),
        })
    }

    /// Base URL endpoints are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint path against the base URL.
    pub fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| FetchError::Unavailable(format!("invalid endpoint '{path}': {e}")))
    }

    /// Fetch and deserialize the full list behind an endpoint.
    ///
    /// # Errors
    ///
    /// - `FetchError::Network` if the request fails or times out
    /// - `FetchError::Http` if the portal answers with a non-success status
    /// - `FetchError::Parse` if the body is not a JSON list of `T`
    pub async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, FetchError> {
        let url = self.endpoint(path)?;

        tracing::debug!(%url, "Fetching list from Management Portal");

        let mut request = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%url, error = %e, "Failed to reach Management Portal");
            FetchError::network(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "Management Portal request failed");
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        let items: Vec<T> = response.json().await.map_err(|e| {
            tracing::warn!(%url, error = %e, "Failed to parse Management Portal response");
            FetchError::parse(e)
        })?;

        tracing::info!(%url, count = items.len(), "Retrieved list from Management Portal");
        Ok(items)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
