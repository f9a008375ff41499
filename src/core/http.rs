//! HTTP capability handed to providers.
//!
//! Providers never build their own client. They receive an [`HttpService`]
//! through their [`PluginContext`](crate::plugin::lifecycle::PluginContext),
//! which keeps transport policy (timeouts, TLS, user agent) in one place and
//! lets tests substitute a recording fake.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::config::HttpConfig;
use crate::errors::HttpError;

/// Abstract `POST` capability
#[async_trait]
pub trait HttpService: Send + Sync {
    /// POST a JSON body and return the raw response bytes.
    ///
    /// Implementations must settle with [`HttpError::Cancelled`] as soon as
    /// `cancel` fires, and must map non-2xx statuses to [`HttpError::Status`].
    async fn post(
        &self,
        url: &str,
        body: &Value,
        headers: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<Bytes, HttpError>;
}

/// [`HttpService`] backed by a shared `reqwest` client
#[derive(Clone)]
pub struct ReqwestHttpService {
    client: reqwest::Client,
}

impl ReqwestHttpService {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HttpError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, url: &str, body: &Value, headers: &HeaderMap) -> Result<Bytes, HttpError> {
        let response = self
            .client
            .post(url)
            .headers(headers.clone())
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response.bytes().await.map_err(map_reqwest_error)
    }
}

#[async_trait]
impl HttpService for ReqwestHttpService {
    async fn post(
        &self,
        url: &str,
        body: &Value,
        headers: &HeaderMap,
        cancel: &CancellationToken,
    ) -> Result<Bytes, HttpError> {
        tracing::debug!(url = %url, "POST");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(HttpError::Cancelled),
            result = self.send(url, body, headers) => result,
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Transport(format!("Request timed out: {e}"))
    } else {
        HttpError::Transport(e.to_string())
    }
}

/// Build a header map from string pairs, rejecting values that are not
/// valid HTTP header text.
pub fn header_map<'a>(
    pairs: impl IntoIterator<Item = (&'a str, String)>,
) -> Result<HeaderMap, HttpError> {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let header_name = http::HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            HttpError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            }
        })?;
        let header_value =
            http::HeaderValue::from_str(&value).map_err(|e| HttpError::InvalidHeader {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
