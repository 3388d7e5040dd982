//! Shared utilities for integration tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use aquagreen_client::api::DashboardClient;
use aquagreen_client::config::ClientConfig;
use aquagreen_client::resilience::Delay;
use aquagreen_client::session::{
    CredentialPair, FileStorage, SessionContext, SessionStorage, UserProfile,
};

/// Backoff delay that returns immediately.
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn sleep(&self, _duration: Duration) {}
}

/// Client wired to a mock server, with its session in a temporary file.
pub struct TestClient {
    pub client: DashboardClient,
    pub session: Arc<SessionContext>,
    pub storage_path: PathBuf,
    _dir: TempDir,
}

impl TestClient {
    /// Re-read the session file from disk.
    #[allow(dead_code)]
    pub fn reopen_storage(&self) -> FileStorage {
        FileStorage::open(&self.storage_path).unwrap()
    }
}

pub fn config_for(server_url: &str) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.api.base_url = format!("{server_url}/api");
    config.api.request_timeout_secs = 5;
    config
}

/// Build a client against `server_url`, optionally logged in as
/// `access-1` / `refresh-1`.
pub fn client_for(server_url: &str, logged_in: bool) -> TestClient {
    let dir = tempfile::tempdir().unwrap();
    let storage_path = dir.path().join("session.json");
    let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::open(&storage_path).unwrap());
    let session = Arc::new(SessionContext::restore(storage));

    if logged_in {
        session
            .set_auth(CredentialPair::new(
                "access-1",
                "refresh-1",
                UserProfile(serde_json::json!({"id": 1, "username": "grower"})),
            ))
            .unwrap();
    }

    let client = DashboardClient::from_config(&config_for(server_url), session.clone())
        .unwrap()
        .with_delay(Arc::new(NoDelay));

    TestClient {
        client,
        session,
        storage_path,
        _dir: dir,
    }
}
