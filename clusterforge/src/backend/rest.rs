//! REST client for the clusters-management API.

use super::{ClusterInfo, ClusterManager, VersionInfo};
use crate::runtime::constants::gateway;
use crate::runtime::options::BackendEnvironment;
use async_trait::async_trait;
use clusterforge_shared::errors::{ForgeError, ForgeResult};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

const API_PREFIX: &str = "/api/clusters_mgmt/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Re-exchange this long before the access token expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Assumed lifetime when the token response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Deserialize)]
struct ListPage<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    refresh_at: Instant,
}

impl AccessToken {
    fn new(response: TokenResponse) -> Self {
        let lifetime = response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME);
        Self {
            value: response.access_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(TOKEN_REFRESH_MARGIN),
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

/// [`ClusterManager`] over HTTPS.
///
/// The offline token is exchanged for a short-lived access token, which is
/// cached until shortly before it expires. A request rejected with 401 drops
/// the cached token and is retried once with a new one, so long readiness
/// waits outlive any single access token.
pub struct RestClusterManager {
    client: Client,
    base_url: String,
    token_url: String,
    offline_token: String,
    exchange: bool,
    access_token: Mutex<Option<AccessToken>>,
}

impl RestClusterManager {
    pub fn new(
        environment: &BackendEnvironment,
        offline_token: impl Into<String>,
    ) -> ForgeResult<Self> {
        let offline_token = offline_token.into();
        if offline_token.trim().is_empty() {
            return Err(ForgeError::Config(
                "a backend token is required to talk to the cloud-management API".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ForgeError::Backend(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: environment.url().trim_end_matches('/').to_string(),
            token_url: gateway::TOKEN_URL.to_string(),
            offline_token,
            exchange: environment.exchanges_token(),
            access_token: Mutex::new(None),
        })
    }

    /// Exchange offline tokens at `url` instead of the public SSO endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{API_PREFIX}{path}", self.base_url)
    }

    async fn bearer(&self) -> ForgeResult<String> {
        if !self.exchange {
            return Ok(self.offline_token.clone());
        }

        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        tracing::debug!(url = %self.token_url, "exchanging offline token");
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", gateway::CLIENT_ID),
                ("refresh_token", self.offline_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ForgeError::Backend(format!("token exchange failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ForgeError::Backend(format!(
                "token exchange failed: HTTP {}",
                response.status()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ForgeError::Backend(format!("unexpected token response: {e}")))?;
        let token = AccessToken::new(body);
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    async fn send(&self, request: RequestBuilder) -> ForgeResult<Response> {
        let retry = request.try_clone();
        let response = self.send_once(request).await?;

        if response.status() != StatusCode::UNAUTHORIZED || !self.exchange {
            return Ok(response);
        }
        let Some(retry) = retry else {
            return Ok(response);
        };

        tracing::debug!("access token rejected, exchanging again");
        self.access_token.lock().await.take();
        self.send_once(retry).await
    }

    async fn send_once(&self, request: RequestBuilder) -> ForgeResult<Response> {
        let token = self.bearer().await?;
        request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| ForgeError::Backend(e.to_string()))
    }

    async fn fail(what: &str, response: Response) -> ForgeError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return ForgeError::NotFound(what.to_string());
        }
        ForgeError::Backend(format!("{what}: HTTP {status}: {body}"))
    }

    async fn list<T: DeserializeOwned>(&self, path: &str, search: &str) -> ForgeResult<Vec<T>> {
        let request = self
            .client
            .get(self.api_url(path))
            .query(&[("search", search), ("size", "-1")]);
        let response = self.send(request).await?;
        if !response.status().is_success() {
            return Err(Self::fail(path, response).await);
        }
        let page: ListPage<T> = response
            .json()
            .await
            .map_err(|e| ForgeError::Backend(format!("unexpected {path} response: {e}")))?;
        Ok(page.items)
    }
}

#[async_trait]
impl ClusterManager for RestClusterManager {
    async fn list_versions(&self, search: &str) -> ForgeResult<Vec<VersionInfo>> {
        self.list("/versions", search).await
    }

    async fn get_cluster(&self, id: &str) -> ForgeResult<Option<ClusterInfo>> {
        let path = format!("/clusters/{}", urlencoding::encode(id));
        let response = self.send(self.client.get(self.api_url(&path))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Self::fail(&format!("cluster {id}"), response).await);
        }
        let info = response
            .json()
            .await
            .map_err(|e| ForgeError::Backend(format!("unexpected cluster response: {e}")))?;
        Ok(Some(info))
    }

    async fn list_clusters(&self, search: &str) -> ForgeResult<Vec<ClusterInfo>> {
        self.list("/clusters", search).await
    }

    async fn delete_cluster(&self, id: &str) -> ForgeResult<()> {
        let path = format!("/clusters/{}", urlencoding::encode(id));
        let response = self.send(self.client.delete(self.api_url(&path))).await?;
        if !response.status().is_success() {
            return Err(Self::fail(&format!("cluster {id}"), response).await);
        }
        tracing::info!(cluster_id = %id, "cluster deletion requested");
        Ok(())
    }
}
