//! Session context: the process's Credential Pair and its durable mirror.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::session::credentials::{AccessToken, CredentialPair, RefreshToken, UserProfile};
use crate::session::storage::{
    SessionStorage, StorageError, REFRESH_TOKEN_KEY, TOKEN_KEY, USER_KEY,
};

/// Explicit session object handed to everything that issues requests.
///
/// Readers get a consistent snapshot of the pair; only the authentication
/// mutations below write it.
pub struct SessionContext {
    credentials: ArcSwapOption<CredentialPair>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionContext {
    /// Create an empty session on top of `storage`, ignoring anything persisted.
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            credentials: ArcSwapOption::empty(),
            storage,
        }
    }

    /// Restore the session persisted in `storage`.
    ///
    /// A pair is restored only when both tokens are present. A half-written
    /// session is wiped rather than trusted.
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let context = Self::new(storage);

        let token = context.storage.get(TOKEN_KEY);
        let refresh = context.storage.get(REFRESH_TOKEN_KEY);

        match (token, refresh) {
            (Some(token), Some(refresh)) => {
                let profile = context
                    .storage
                    .get(USER_KEY)
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .map(UserProfile)
                    .unwrap_or_default();
                context
                    .credentials
                    .store(Some(Arc::new(CredentialPair::new(token, refresh, profile))));
                tracing::debug!("Restored persisted session");
            }
            (None, None) => {}
            _ => {
                tracing::warn!("Persisted session holds only one token, discarding it");
                context.clear_auth();
            }
        }

        context
    }

    /// Current pair, if authenticated.
    pub fn credentials(&self) -> Option<Arc<CredentialPair>> {
        self.credentials.load_full()
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        self.credentials
            .load()
            .as_ref()
            .map(|pair| pair.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.credentials
            .load()
            .as_ref()
            .map(|pair| pair.refresh_token.clone())
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.credentials
            .load()
            .as_ref()
            .map(|pair| pair.profile.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.load().is_some()
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Install a new pair (login, registration) and persist it.
    pub fn set_auth(&self, pair: CredentialPair) -> Result<(), StorageError> {
        let profile = serde_json::to_string(&pair.profile)?;
        let token = pair.access_token.as_str().to_string();
        let refresh = pair.refresh_token.as_str().to_string();

        self.credentials.store(Some(Arc::new(pair)));

        self.storage.set(TOKEN_KEY, &token)?;
        self.storage.set(REFRESH_TOKEN_KEY, &refresh)?;
        self.storage.set(USER_KEY, &profile)?;
        Ok(())
    }

    /// Replace the access token in place, keeping refresh token and profile.
    ///
    /// Returns false when there is no pair to update (e.g. a logout raced
    /// the refresh); the token is then discarded.
    pub fn update_access_token(&self, token: AccessToken) -> bool {
        let mut updated = false;
        self.credentials.rcu(|current| match current {
            Some(pair) => {
                updated = true;
                Some(Arc::new(pair.with_access_token(token.clone())))
            }
            None => {
                updated = false;
                None
            }
        });

        if updated {
            if let Err(e) = self.storage.set(TOKEN_KEY, token.as_str()) {
                tracing::warn!(error = %e, "Failed to persist refreshed access token");
            }
        }
        updated
    }

    /// Destroy the whole pair, in memory and on disk.
    pub fn clear_auth(&self) {
        self.credentials.store(None);

        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                tracing::warn!(key, error = %e, "Failed to remove persisted session key");
            }
        }
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}
