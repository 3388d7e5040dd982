//! Access token refresh.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::error::AuthError;
use crate::http::request::ApiRequest;
use crate::http::transport::Transport;
use crate::observability::metrics;
use crate::session::{AccessToken, SessionContext};

pub const REFRESH_PATH: &str = "auth/token/refresh/";

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

/// Exchanges the held refresh token for a new access token.
#[derive(Clone)]
pub struct TokenRefresher {
    transport: Arc<dyn Transport>,
    session: Arc<SessionContext>,
}

impl TokenRefresher {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionContext>) -> Self {
        Self { transport, session }
    }

    /// Obtain a new access token and install it in the session.
    ///
    /// Any failure clears the whole Credential Pair before returning.
    /// Without a refresh token nothing is sent.
    pub async fn refresh(&self) -> Result<AccessToken, AuthError> {
        let result = self.try_refresh().await;
        match &result {
            Ok(_) => {
                metrics::record_token_refresh("success");
                tracing::info!("Access token refreshed");
            }
            Err(e) => {
                metrics::record_token_refresh("failure");
                tracing::warn!(error = %e, "Token refresh failed, clearing session");
                self.session.clear_auth();
            }
        }
        result
    }

    async fn try_refresh(&self) -> Result<AccessToken, AuthError> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(AuthError::NoRefreshToken)?;

        let request = ApiRequest::post(REFRESH_PATH)
            .json(json!({ "refresh": refresh_token.as_str() }))
            .public();

        let response = self.transport.send(&request).await?;
        if !response.is_success() {
            return Err(AuthError::RefreshRejected {
                status: response.status,
                body: response.text(),
            });
        }

        let body: RefreshResponse =
            serde_json::from_slice(&response.body).map_err(|e| AuthError::Decode(e.to_string()))?;
        let token = AccessToken::new(body.access);

        // A logout that raced the refresh leaves nothing to update.
        if !self.session.update_access_token(token.clone()) {
            return Err(AuthError::NoRefreshToken);
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::http::request::{ApiResponse, RequestBody};
    use crate::session::{CredentialPair, MemoryStorage, UserProfile};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use serde_json::Value;

    struct FakeTransport {
        reply: Mutex<Option<Result<ApiResponse, TransportError>>>,
        seen: Mutex<Vec<ApiRequest>>,
    }

    impl FakeTransport {
        fn new(reply: Result<ApiResponse, TransportError>) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(reply)),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
            self.seen.lock().push(request.clone());
            self.reply
                .lock()
                .take()
                .unwrap_or_else(|| Err(TransportError::Other("no scripted reply".into())))
        }
    }

    fn session() -> Arc<SessionContext> {
        let session = Arc::new(SessionContext::new(Arc::new(MemoryStorage::new())));
        session
            .set_auth(CredentialPair::new("old", "refresh-1", UserProfile::default()))
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_refresh_installs_new_token() {
        let transport = FakeTransport::new(Ok(ApiResponse::new(
            StatusCode::OK,
            r#"{"access": "new"}"#,
        )));
        let session = session();
        let refresher = TokenRefresher::new(transport.clone(), session.clone());

        let token = refresher.refresh().await.unwrap();

        assert_eq!(token.as_str(), "new");
        assert_eq!(session.access_token().unwrap().as_str(), "new");
        assert_eq!(session.refresh_token().unwrap().as_str(), "refresh-1");

        let seen = transport.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path, REFRESH_PATH);
        assert!(seen[0].authorization().is_none());
        match &seen[0].body {
            RequestBody::Json(body) => assert_eq!(body["refresh"], Value::from("refresh-1")),
            other => panic!("unexpected body {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_refresh_token_sends_nothing() {
        let transport = FakeTransport::new(Ok(ApiResponse::new(StatusCode::OK, "{}")));
        let session = Arc::new(SessionContext::new(Arc::new(MemoryStorage::new())));
        let refresher = TokenRefresher::new(transport.clone(), session);

        let err = refresher.refresh().await.unwrap_err();

        assert!(matches!(err, AuthError::NoRefreshToken));
        assert!(transport.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_session() {
        let transport = FakeTransport::new(Ok(ApiResponse::new(
            StatusCode::UNAUTHORIZED,
            r#"{"detail": "Token is blacklisted"}"#,
        )));
        let session = session();
        let refresher = TokenRefresher::new(transport, session.clone());

        let err = refresher.refresh().await.unwrap_err();

        assert!(matches!(
            err,
            AuthError::RefreshRejected { status: StatusCode::UNAUTHORIZED, .. }
        ));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_transport_failure_clears_session() {
        let transport = FakeTransport::new(Err(TransportError::Connect("refused".into())));
        let session = session();
        let refresher = TokenRefresher::new(transport, session.clone());

        assert!(matches!(
            refresher.refresh().await,
            Err(AuthError::Transport(TransportError::Connect(_)))
        ));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_response_clears_session() {
        let transport = FakeTransport::new(Ok(ApiResponse::new(StatusCode::OK, r#"{"token": 1}"#)));
        let session = session();
        let refresher = TokenRefresher::new(transport, session.clone());

        assert!(matches!(refresher.refresh().await, Err(AuthError::Decode(_))));
        assert!(!session.is_authenticated());
    }
}
