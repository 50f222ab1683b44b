/*
[INPUT]:  HTTP configuration (base URL, timeouts) and bearer tokens
[OUTPUT]: Configured reqwest client ready for API calls
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

use crate::http::{ExamdeskError, Result};

pub(crate) const HEADER_REQUEST_ID: &str = "x-request-id";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Main HTTP client for the examdesk API
#[derive(Debug, Clone)]
pub struct ExamdeskClient {
    http_client: Client,
    base_url: Url,
    timeout: Duration,
}

impl ExamdeskClient {
    /// Create a new client with default configuration
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(ClientConfig::default(), base_url)
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig, base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ExamdeskError::Config(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }

        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build full URL from path segments, percent-encoding each segment
    pub(crate) fn endpoint_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ExamdeskError::Config(format!("invalid base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build request builder carrying a bearer token and a request id
    pub(crate) fn request_with_token(
        &self,
        method: Method,
        segments: &[&str],
        token: &str,
    ) -> Result<RequestBuilder> {
        if token.trim().is_empty() {
            return Err(ExamdeskError::Authentication {
                message: "missing bearer token".to_string(),
            });
        }

        let url = self.endpoint_url(segments)?;
        Ok(self
            .http_client
            .request(method, url)
            .bearer_auth(token)
            .header(HEADER_REQUEST_ID, Uuid::new_v4().to_string()))
    }

    /// Send a request and decode a JSON body, mapping HTTP failures to typed errors
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ExamdeskError::Authentication {
                message: error_message(status, &body),
            });
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.trim().parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ExamdeskError::RateLimit { retry_after });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExamdeskError::api_error(status, error_message(status, &body)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn transport_error(&self, err: reqwest::Error) -> ExamdeskError {
        if err.is_timeout() {
            ExamdeskError::Timeout {
                duration: self.timeout.as_secs(),
            }
        } else {
            ExamdeskError::Http(err)
        }
    }
}

/// Pick a human readable message out of an error body.
///
/// The API answers `{"message": ..}` or `{"detail": ..}`; proxies answer plain text.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "detail", "error"] {
            if let Some(text) = value.get(key).and_then(|v| v.as_str()) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}
