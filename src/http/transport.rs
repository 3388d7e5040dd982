//! Transport layer: turns request descriptors into HTTP exchanges.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderValue, USER_AGENT};
use url::Url;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::error::TransportError;
use crate::http::request::{ApiRequest, ApiResponse, RequestBody};
use crate::observability::metrics;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Sends one request and buffers the response.
///
/// Non-success statuses are responses, not errors; only failures to obtain a
/// response are `TransportError`s.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// reqwest-backed transport rooted at the API base URL.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
    default_timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport from API configuration.
    pub fn new(config: &ApiConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| TransportError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: normalize_base(&config.base_url)?,
            default_timeout: config.request_timeout(),
        })
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve a request path and query against the base URL.
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let path = request.path.trim_start_matches('/');
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TransportError::Other(format!("invalid request path '{path}': {e}")))?;

        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }
}

fn normalize_base(raw: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(raw)
        .map_err(|e| TransportError::Other(format!("invalid base URL '{raw}': {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(request)?;
        let request_id = Uuid::new_v4().to_string();

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .timeout(request.timeout.unwrap_or(self.default_timeout))
            .header(
                USER_AGENT,
                HeaderValue::from_static(concat!("aquagreen-client/", env!("CARGO_PKG_VERSION"))),
            )
            .header(X_REQUEST_ID, request_id.as_str())
            .headers(request.headers.clone());

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(body) => builder.multipart(body.to_form()?),
        };

        let started = Instant::now();
        let method = request.method.as_str();

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = TransportError::from(e);
                tracing::warn!(
                    method,
                    path = %request.path,
                    request_id = %request_id,
                    error = %err,
                    "Request failed without response"
                );
                metrics::record_request(method, "error");
                return Err(err);
            }
        };

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(TransportError::from)?.to_vec();

        tracing::debug!(
            method,
            path = %request.path,
            status = status.as_u16(),
            request_id = %request_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
        metrics::record_request(method, status.as_str());

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        let config = ApiConfig {
            base_url: base.to_string(),
            ..ApiConfig::default()
        };
        ReqwestTransport::new(&config).unwrap()
    }

    #[test]
    fn test_base_path_is_kept_when_joining() {
        let transport = transport("http://127.0.0.1:8000/api");
        let url = transport.url_for(&ApiRequest::get("excel-files/")).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/excel-files/");

        let url = transport.url_for(&ApiRequest::get("/auth/login/")).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/auth/login/");
    }

    #[test]
    fn test_query_pairs_are_encoded() {
        let transport = transport("http://localhost:8000/api/");
        let request = ApiRequest::get("crop-images/")
            .query("sample_id", "S 01")
            .query("metadata_label", "variety");
        let url = transport.url_for(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/crop-images/?sample_id=S+01&metadata_label=variety"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = ApiConfig {
            base_url: "not a url".into(),
            ..ApiConfig::default()
        };
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(TransportError::Other(_))
        ));
    }

    #[tokio::test]
    async fn test_connection_refused_is_classified() {
        let transport = transport("http://127.0.0.1:9/api");
        let err = transport
            .send(&ApiRequest::get("excel-files/"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connect(_)), "got {err:?}");
    }
}
