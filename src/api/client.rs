//! Dashboard client: the pipeline plus shared state.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::api::state::{DashboardState, StateStore};
use crate::config::{ApiConfig, ClientConfig};
use crate::error::ApiError;
use crate::http::{ApiRequest, AuthPipeline, ReqwestTransport};
use crate::resilience::{Delay, RetryPolicy, TokioDelay};
use crate::session::SessionContext;

/// Issues dashboard actions through the authenticated pipeline and keeps
/// their results in a [`DashboardState`].
pub struct DashboardClient {
    pub(crate) pipeline: Arc<AuthPipeline>,
    pub(crate) api: ApiConfig,
    pub(crate) retry: RetryPolicy,
    pub(crate) delay: Arc<dyn Delay>,
    pub(crate) store: StateStore,
}

impl DashboardClient {
    pub fn new(pipeline: Arc<AuthPipeline>, config: &ClientConfig) -> Self {
        Self {
            pipeline,
            api: config.api.clone(),
            retry: RetryPolicy::from(&config.retries),
            delay: Arc::new(TokioDelay),
            store: StateStore::new(),
        }
    }

    /// Build the reqwest transport and pipeline from configuration.
    pub fn from_config(
        config: &ClientConfig,
        session: Arc<SessionContext>,
    ) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config.api)?;
        let pipeline = AuthPipeline::new(Arc::new(transport), session);
        Ok(Self::new(Arc::new(pipeline), config))
    }

    /// Use a custom delay for retry backoff (for testing).
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    pub fn pipeline(&self) -> &Arc<AuthPipeline> {
        &self.pipeline
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        self.pipeline.session()
    }

    pub fn snapshot(&self) -> DashboardState {
        self.store.snapshot()
    }

    /// Run an action with loading tracking and error recording.
    ///
    /// `last_error` is cleared on entry; on failure it receives the error's
    /// user message, or `fallback`, and the error is returned.
    pub(crate) async fn run<T, Fut>(&self, fallback: &str, action: Fut) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let _loading = self.store.begin();
        self.store.set_error(None);

        let result = action.await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "{fallback}");
            self.store.set_error(Some(e.user_message(fallback)));
        }
        result
    }

    pub(crate) async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> Result<T, ApiError> {
        self.pipeline.execute(request).await?.json()
    }
}
