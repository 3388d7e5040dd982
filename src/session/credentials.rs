//! Credential Pair types.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Short-lived bearer credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Authorization` header value in the bearer scheme.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Longer-lived credential used only to mint new access tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RefreshToken(<redacted>)")
    }
}

/// User-identifying payload returned at login/registration.
///
/// Opaque to the pipeline: passed through and persisted, never inspected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(pub Value);

impl UserProfile {
    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// The unit of authentication state.
#[derive(Debug, Clone, PartialEq)]
pub struct CredentialPair {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
    pub profile: UserProfile,
}

impl CredentialPair {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        profile: UserProfile,
    ) -> Self {
        Self {
            access_token: AccessToken::new(access_token),
            refresh_token: RefreshToken::new(refresh_token),
            profile,
        }
    }

    /// Same pair with the access token replaced.
    pub fn with_access_token(&self, access_token: AccessToken) -> Self {
        Self {
            access_token,
            refresh_token: self.refresh_token.clone(),
            profile: self.profile.clone(),
        }
    }
}
