//! Authenticated request pipeline.
//!
//! # Responsibilities
//! - Attach the session's bearer credential to every outgoing request
//! - Recover from an expired access token: refresh once, replay once
//! - Turn an unrecoverable refresh into a session-expired notification
//!
//! # Design Decisions
//! - `Authorization` is always derived from the session at send time; the
//!   copy kept in the default headers is informational only, so a stale
//!   default can never outlive a logout
//! - Refreshes are single-flight: a 401 that arrives while another refresh
//!   is running waits for it and reuses its token
//! - Only the first 401 of a request is recovered; the replay's outcome is
//!   final

use std::sync::Arc;

use arc_swap::ArcSwap;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use tokio::sync::Mutex;

use crate::auth::TokenRefresher;
use crate::error::{ApiError, AuthError, TransportError};
use crate::http::request::{ApiRequest, ApiResponse};
use crate::http::transport::Transport;
use crate::observability::metrics;
use crate::session::{AccessToken, SessionContext};

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Receives the user-facing side effects of a terminal refresh failure.
pub trait SessionObserver: Send + Sync {
    /// Show an error notification.
    fn session_expired(&self, message: &str);

    /// Navigate to the login view.
    fn redirect_to_login(&self);
}

/// Observer that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn session_expired(&self, message: &str) {
        tracing::error!("{message}");
    }

    fn redirect_to_login(&self) {
        tracing::info!("Redirecting to login");
    }
}

/// Executes requests with credential attachment and 401 recovery.
pub struct AuthPipeline {
    transport: Arc<dyn Transport>,
    session: Arc<SessionContext>,
    refresher: TokenRefresher,
    default_headers: ArcSwap<HeaderMap>,
    observer: Arc<dyn SessionObserver>,
    /// Held for the duration of a refresh. Holds the Authorization value
    /// whose refresh last failed, so its waiters expire quietly.
    refresh_lock: Mutex<Option<String>>,
}

impl AuthPipeline {
    pub fn new(transport: Arc<dyn Transport>, session: Arc<SessionContext>) -> Self {
        let refresher = TokenRefresher::new(transport.clone(), session.clone());
        Self {
            transport,
            session,
            refresher,
            default_headers: ArcSwap::from_pointee(HeaderMap::new()),
            observer: Arc::new(LoggingObserver),
            refresh_lock: Mutex::new(None),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn refresher(&self) -> &TokenRefresher {
        &self.refresher
    }

    /// Snapshot of the headers merged into every request.
    pub fn default_headers(&self) -> Arc<HeaderMap> {
        self.default_headers.load_full()
    }

    pub fn set_default_header(&self, name: HeaderName, value: HeaderValue) {
        self.default_headers.rcu(|current| {
            let mut headers = HeaderMap::clone(current);
            headers.insert(name.clone(), value.clone());
            headers
        });
    }

    pub fn remove_default_header(&self, name: &HeaderName) {
        self.default_headers.rcu(|current| {
            let mut headers = HeaderMap::clone(current);
            headers.remove(name);
            headers
        });
    }

    /// Outbound interceptor: merge defaults and attach the bearer credential.
    ///
    /// Headers already set on the request win over defaults. For
    /// authenticated requests `Authorization` mirrors the session exactly:
    /// present when a token is held, absent otherwise.
    pub fn intercept_outbound(&self, request: &mut ApiRequest) -> Result<(), ApiError> {
        let defaults = self.default_headers.load();
        for (name, value) in defaults.iter() {
            if name == AUTHORIZATION || request.headers.contains_key(name) {
                continue;
            }
            request.headers.insert(name.clone(), value.clone());
        }

        if request.is_authenticated() {
            match self.session.access_token() {
                Some(token) => {
                    request.headers.insert(AUTHORIZATION, bearer_value(&token)?);
                }
                None => {
                    request.headers.remove(AUTHORIZATION);
                }
            }
        }
        Ok(())
    }

    /// Send a request through both interceptors.
    ///
    /// A 401 on an authenticated request that was not yet replayed triggers
    /// a refresh and exactly one replay. Every other non-success status is
    /// returned as [`ApiError::Status`].
    pub async fn execute(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        loop {
            self.intercept_outbound(&mut request)?;
            let response = self.transport.send(&request).await?;

            if response.is_success() {
                return Ok(response);
            }

            if response.status != StatusCode::UNAUTHORIZED
                || !request.is_authenticated()
                || request.is_retried()
            {
                return Err(response.into_error());
            }

            request.mark_retried();
            tracing::debug!(
                method = %request.method,
                path = %request.path,
                "Access token rejected, refreshing"
            );

            let sent_with = request.authorization().map(str::to_owned);
            let token = self.refresh_after_rejection(sent_with.as_deref()).await?;

            let value = bearer_value(&token)?;
            self.set_default_header(AUTHORIZATION, value.clone());
            request.headers.insert(AUTHORIZATION, value);
        }
    }

    /// Run (or join) the refresh for a request rejected with `sent_with`.
    async fn refresh_after_rejection(
        &self,
        sent_with: Option<&str>,
    ) -> Result<AccessToken, ApiError> {
        let mut expired_for = self.refresh_lock.lock().await;

        // Another request already refreshed while this one waited.
        if let Some(current) = self.session.access_token() {
            if sent_with != Some(current.bearer().as_str()) {
                metrics::record_token_refresh("reused");
                return Ok(current);
            }
        }

        // The refresh this request waited on failed and was already reported.
        if sent_with.is_some() && expired_for.as_deref() == sent_with {
            return Err(ApiError::SessionExpired(AuthError::NoRefreshToken));
        }

        match self.refresher.refresh().await {
            Ok(token) => {
                *expired_for = None;
                Ok(token)
            }
            Err(e) => {
                *expired_for = sent_with.map(str::to_owned);
                self.session.clear_auth();
                self.remove_default_header(&AUTHORIZATION);
                self.observer.session_expired(SESSION_EXPIRED_MESSAGE);
                self.observer.redirect_to_login();
                Err(ApiError::SessionExpired(e))
            }
        }
    }
}

fn bearer_value(token: &AccessToken) -> Result<HeaderValue, ApiError> {
    let mut value = HeaderValue::from_str(&token.bearer()).map_err(|_| {
        ApiError::Transport(TransportError::Other(
            "access token is not a valid header value".to_string(),
        ))
    })?;
    value.set_sensitive(true);
    Ok(value)
}
