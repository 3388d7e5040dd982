//! Replayable request descriptors and buffered responses.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, TransportError};

/// One part of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// Multipart form that owns its content, so it can be rebuilt for a replay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartBody {
    parts: Vec<MultipartPart>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(MultipartPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        self.parts.push(MultipartPart::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type: None,
            bytes,
        });
        self
    }

    /// Read a file from disk into a part named `name`.
    pub async fn file_from_path(
        self,
        name: impl Into<String>,
        path: &Path,
    ) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(self.file(name, file_name, bytes))
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    /// Build a fresh reqwest form from the owned parts.
    pub fn to_form(&self) -> Result<reqwest::multipart::Form, TransportError> {
        let mut form = reqwest::multipart::Form::new();
        for part in &self.parts {
            form = match part {
                MultipartPart::Text { name, value } => form.text(name.clone(), value.clone()),
                MultipartPart::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut file_part =
                        reqwest::multipart::Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(mime) = content_type {
                        file_part = file_part
                            .mime_str(mime)
                            .map_err(|e| TransportError::Other(format!("invalid content type: {e}")))?;
                    }
                    form.part(name.clone(), file_part)
                }
            };
        }
        Ok(form)
    }
}

/// Request payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartBody),
}

/// Outgoing request descriptor.
///
/// Paths are relative to the configured API base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
    authenticated: bool,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: RequestBody::Empty,
            timeout: None,
            authenticated: true,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn multipart(mut self, body: MultipartBody) -> Self {
        self.body = RequestBody::Multipart(body);
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Mark the request as credential-free (login, registration).
    ///
    /// No bearer header is attached and a 401 is returned to the caller
    /// instead of triggering a refresh.
    pub fn public(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Whether the request was already replayed after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Current `Authorization` header value, if any.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
    }
}

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub(crate) fn into_error(self) -> ApiError {
        ApiError::Status {
            status: self.status,
            body: self.text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_defaults() {
        let request = ApiRequest::get("excel-files/");
        assert_eq!(request.method, Method::GET);
        assert!(request.is_authenticated());
        assert!(!request.is_retried());
        assert!(request.authorization().is_none());
        assert_eq!(request.body, RequestBody::Empty);
    }

    #[test]
    fn test_public_request() {
        let request = ApiRequest::post("auth/login/").public();
        assert!(!request.is_authenticated());
    }

    #[test]
    fn test_clone_keeps_multipart_content() {
        let body = MultipartBody::new()
            .text("title", "Greenhouse A")
            .file("file", "a.xlsx", vec![1, 2, 3]);
        let request = ApiRequest::post("excel-files/").multipart(body.clone());
        let replay = request.clone();

        assert_eq!(replay.body, RequestBody::Multipart(body));
        assert!(request_form_builds(&replay));
    }

    fn request_form_builds(request: &ApiRequest) -> bool {
        match &request.body {
            RequestBody::Multipart(body) => body.to_form().is_ok(),
            _ => false,
        }
    }

    #[test]
    fn test_response_json_decoding() {
        let response = ApiResponse::new(StatusCode::OK, r#"{"access": "t"}"#);
        let value: Value = response.json().unwrap();
        assert_eq!(value, json!({"access": "t"}));

        let empty = ApiResponse::new(StatusCode::NO_CONTENT, "");
        let value: Value = empty.json().unwrap();
        assert_eq!(value, Value::Null);

        let broken = ApiResponse::new(StatusCode::OK, "<html>");
        assert!(matches!(broken.json::<Value>(), Err(ApiError::Decode(_))));
    }
}
