//! HTTP client for the license admin API

use std::time::Duration;

use license_types::{ApiCallResult, ApiError, LinkRequest, ResetDevicesRequest};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Url};
use tracing::{debug, error, warn};

use crate::api::AdminApi;
use crate::endpoints;
use crate::error::{Error, Result};

/// Message returned when the server cannot be reached at all.
pub const UNREACHABLE_MESSAGE: &str = "could not reach server";

/// Characters of a non-JSON body kept in the envelope's `details`.
const DETAILS_MAX_CHARS: usize = 200;

/// Characters of a non-JSON body written to the log.
const LOGGED_BODY_MAX_CHARS: usize = 500;

/// Admin API client configuration
#[derive(Debug, Clone)]
pub struct AdminClientConfig {
    /// Base URL of the remote service, e.g. `https://licenses.example.com`
    pub base_url: String,
    /// Shared secret sent in the `x-admin-key` header
    pub secret_key: String,
    /// Overall request timeout. `None` leaves it to the transport.
    pub timeout: Option<Duration>,
}

/// Authenticated client for the remote admin API
#[derive(Clone)]
pub struct AdminClient {
    http: Client,
    base_url: String,
    default_headers: HeaderMap,
}

impl AdminClient {
    /// Create a new client.
    pub fn new(config: AdminClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|e| Error::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut secret = HeaderValue::from_str(&config.secret_key)?;
        secret.set_sensitive(true);
        default_headers.insert(HeaderName::from_static(endpoints::ADMIN_KEY_HEADER), secret);

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url,
            default_headers,
        })
    }

    /// Base URL every endpoint is appended to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call `endpoint` with the default headers.
    pub async fn call(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&serde_json::Value>,
    ) -> ApiCallResult {
        self.call_with_headers(endpoint, method, body, &HeaderMap::new())
            .await
    }

    /// Call `endpoint`, merging `extra_headers` over the default headers.
    pub async fn call_with_headers(
        &self,
        endpoint: &str,
        method: Method,
        body: Option<&serde_json::Value>,
        extra_headers: &HeaderMap,
    ) -> ApiCallResult {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Calling admin API: {} {}", method, url);

        let mut headers = self.default_headers.clone();
        for (name, value) in extra_headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut request = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                error!("Admin API call to {} failed: {}", url, e);
                return ApiCallResult::failure(503, ApiError::new(UNREACHABLE_MESSAGE, e.to_string()));
            }
        };

        let status = response.status();
        debug!("Admin API responded with status {}", status.as_u16());

        let declares_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.contains("application/json"));

        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => {
                error!("Failed to read admin API response body from {}: {}", url, e);
                return ApiCallResult::failure(503, ApiError::new(UNREACHABLE_MESSAGE, e.to_string()));
            }
        };

        if declares_json {
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(payload) => {
                    debug!("Admin API JSON response parsed");
                    return ApiCallResult {
                        ok: status.is_success(),
                        status: status.as_u16(),
                        payload,
                    };
                }
                Err(e) => {
                    warn!("Admin API declared JSON but the body did not parse: {}", e);
                }
            }
        }

        warn!(
            "Admin API response is not JSON (status {}): {}",
            status.as_u16(),
            truncate_chars(&text, LOGGED_BODY_MAX_CHARS)
        );

        ApiCallResult::failure(
            status.as_u16(),
            ApiError::new(
                format!(
                    "server error: {}",
                    status.canonical_reason().unwrap_or("unknown status")
                ),
                truncate_chars(&text, DETAILS_MAX_CHARS),
            ),
        )
    }
}

impl AdminApi for AdminClient {
    async fn list_keys(&self) -> ApiCallResult {
        self.call(endpoints::LIST, Method::GET, None).await
    }

    async fn add_key(&self) -> ApiCallResult {
        self.call(endpoints::ADD, Method::POST, None).await
    }

    async fn link_key(&self, request: &LinkRequest) -> ApiCallResult {
        match serde_json::to_value(request) {
            Ok(body) => self.call(endpoints::LINK, Method::POST, Some(&body)).await,
            Err(e) => ApiCallResult::failure(400, ApiError::new("invalid link request", e.to_string())),
        }
    }

    async fn reset_devices(&self, request: &ResetDevicesRequest) -> ApiCallResult {
        match serde_json::to_value(request) {
            Ok(body) => {
                self.call(endpoints::RESET_DEVICES, Method::POST, Some(&body))
                    .await
            }
            Err(e) => ApiCallResult::failure(400, ApiError::new("invalid reset request", e.to_string())),
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> AdminClientConfig {
        AdminClientConfig {
            base_url: base_url.to_string(),
            secret_key: "s3cret".to_string(),
            timeout: None,
        }
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let client = AdminClient::new(config("http://localhost:3000/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let err = AdminClient::new(config("not a url")).err().unwrap();
        assert!(matches!(err, Error::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_invalid_secret_rejected() {
        let mut cfg = config("http://localhost:3000");
        cfg.secret_key = "line\nbreak".to_string();
        let err = AdminClient::new(cfg).err().unwrap();
        assert!(matches!(err, Error::InvalidSecret(_)));
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("ééééé", 3), "ééé");
        assert_eq!(truncate_chars("ab", 10), "ab");
    }
}
