//! Account actions: registration, login, logout and profile.

use std::path::Path;

use serde_json::Value;

use crate::api::client::DashboardClient;
use crate::api::types::{AuthResponse, Credentials, RegisterRequest, RegistrationOutcome};
use crate::error::{ApiError, AuthError};
use crate::http::{ApiRequest, MultipartBody};
use crate::session::{CredentialPair, UserProfile};

impl DashboardClient {
    /// Create an account. Unless the backend asks for address verification,
    /// the returned tokens become the session.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegistrationOutcome, ApiError> {
        self.run("Registration failed", async {
            let body = serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;
            let response: AuthResponse = self
                .fetch_json(ApiRequest::post("auth/register/").json(body).public())
                .await?;

            if response.success != Some(true) {
                let message = match response.errors {
                    Some(Value::String(s)) => s,
                    Some(other) => other.to_string(),
                    None => "Registration failed".to_string(),
                };
                return Err(ApiError::Registration(message));
            }

            if response.requires_verification {
                tracing::info!(username = %request.username, "Registration needs verification");
                return Ok(RegistrationOutcome::VerificationRequired {
                    message: response.message,
                });
            }

            let profile = self.install_session(response)?;
            tracing::info!(username = %request.username, "Registered and logged in");
            Ok(RegistrationOutcome::LoggedIn(profile))
        })
        .await
    }

    /// Log in and install the returned Credential Pair.
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, ApiError> {
        self.run("Login failed", async {
            let body =
                serde_json::to_value(credentials).map_err(|e| ApiError::Decode(e.to_string()))?;
            let response: AuthResponse = self
                .fetch_json(ApiRequest::post("auth/login/").json(body).public())
                .await?;
            let profile = self.install_session(response)?;
            tracing::info!(username = %credentials.username, "Logged in");
            Ok(profile)
        })
        .await
    }

    /// Drop the session locally. No request is sent.
    pub fn logout(&self) {
        self.session().clear_auth();
        self.pipeline
            .remove_default_header(&reqwest::header::AUTHORIZATION);
        tracing::info!("Logged out");
    }

    pub async fn fetch_profile(&self) -> Result<UserProfile, ApiError> {
        self.run("Failed to fetch user profile", async {
            self.fetch_json(ApiRequest::get("auth/profile/")).await
        })
        .await
    }

    pub async fn update_profile_image(&self, image: &Path) -> Result<UserProfile, ApiError> {
        self.run("Failed to update profile image", async {
            let body = MultipartBody::new().file_from_path("profile_image", image).await?;
            self.fetch_json(ApiRequest::patch("auth/profile/").multipart(body))
                .await
        })
        .await
    }

    fn install_session(&self, response: AuthResponse) -> Result<UserProfile, ApiError> {
        let (Some(access), Some(refresh)) = (response.access, response.refresh) else {
            return Err(ApiError::Auth(AuthError::Decode(
                "authentication response is missing tokens".to_string(),
            )));
        };
        let profile = response.user;
        self.session()
            .set_auth(CredentialPair::new(access, refresh, profile.clone()))?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::{client, ok, status, ScriptedTransport};
    use crate::session::storage::{SessionStorage, TOKEN_KEY};

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            username: "grower".into(),
            email: "grower@example.com".into(),
            password: "s3cure-pass".into(),
        }
    }

    #[tokio::test]
    async fn test_login_installs_session() {
        let transport = ScriptedTransport::with(vec![ok(
            r#"{"access": "A", "refresh": "R", "user": {"id": 1, "username": "grower"}, "success": true}"#,
        )]);
        let (client, _) = client(transport.clone());
        client.logout();

        let profile = client
            .login(&Credentials {
                username: "grower".into(),
                password: "pw".into(),
            })
            .await
            .unwrap();

        assert_eq!(profile.0["username"], "grower");
        assert_eq!(client.session().access_token().unwrap().as_str(), "A");
        assert_eq!(client.session().storage().get(TOKEN_KEY).as_deref(), Some("A"));
        assert!(transport.requests.lock()[0].authorization().is_none());
    }

    #[tokio::test]
    async fn test_bad_login_does_not_expire_session() {
        let transport = ScriptedTransport::with(vec![status(
            401,
            r#"{"detail": "No active account found with the given credentials"}"#,
        )]);
        let (client, _) = client(transport.clone());
        client.logout();

        let err = client
            .login(&Credentials {
                username: "grower".into(),
                password: "wrong".into(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::UNAUTHORIZED));
        assert_eq!(transport.paths(), vec!["auth/login/".to_string()]);
        assert_eq!(
            client.snapshot().last_error.as_deref(),
            Some("No active account found with the given credentials")
        );
    }

    #[tokio::test]
    async fn test_register_outcomes() {
        let transport = ScriptedTransport::with(vec![
            ok(r#"{"success": true, "access": "A", "refresh": "R", "user": {"id": 2}}"#),
            ok(r#"{"success": true, "requires_verification": true, "message": "Check your email"}"#),
            ok(r#"{"success": false, "errors": "User with this email already exists"}"#),
        ]);
        let (client, _) = client(transport);

        assert!(matches!(
            client.register(&register_request()).await.unwrap(),
            RegistrationOutcome::LoggedIn(_)
        ));
        assert_eq!(client.session().access_token().unwrap().as_str(), "A");

        assert_eq!(
            client.register(&register_request()).await.unwrap(),
            RegistrationOutcome::VerificationRequired {
                message: Some("Check your email".into())
            }
        );

        let err = client.register(&register_request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Registration(_)));
        assert_eq!(
            client.snapshot().last_error.as_deref(),
            Some("User with this email already exists")
        );
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (client, _) = client(ScriptedTransport::with(vec![]));
        client.logout();

        assert!(!client.session().is_authenticated());
        assert!(client.session().storage().get(TOKEN_KEY).is_none());
    }
}
