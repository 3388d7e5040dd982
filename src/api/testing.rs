//! Test doubles shared by the action tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::api::client::DashboardClient;
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{ApiRequest, ApiResponse, AuthPipeline, RequestBody, Transport};
use crate::resilience::Delay;
use crate::session::{CredentialPair, MemoryStorage, SessionContext, UserProfile};

/// Replies from a script, recording every request it receives.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    pub(crate) requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn with(replies: Vec<Result<ApiResponse, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn paths(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.path.clone()).collect()
    }

    pub(crate) fn body(&self, index: usize) -> RequestBody {
        self.requests.lock()[index].body.clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
    }
}

#[derive(Default)]
pub(crate) struct RecordingDelay(pub(crate) Mutex<Vec<Duration>>);

#[async_trait]
impl Delay for RecordingDelay {
    async fn sleep(&self, duration: Duration) {
        self.0.lock().push(duration);
    }
}

pub(crate) fn ok(body: &str) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(StatusCode::OK, body.to_string()))
}

pub(crate) fn status(code: u16, body: &str) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(
        StatusCode::from_u16(code).unwrap(),
        body.to_string(),
    ))
}

/// Logged-in client over `transport` with a recording delay.
pub(crate) fn client(transport: Arc<ScriptedTransport>) -> (DashboardClient, Arc<RecordingDelay>) {
    let session = Arc::new(SessionContext::new(Arc::new(MemoryStorage::new())));
    session
        .set_auth(CredentialPair::new("a", "r", UserProfile::default()))
        .unwrap();
    let pipeline = Arc::new(AuthPipeline::new(transport, session));
    let delay = Arc::new(RecordingDelay::default());
    let client =
        DashboardClient::new(pipeline, &ClientConfig::default()).with_delay(delay.clone());
    (client, delay)
}
