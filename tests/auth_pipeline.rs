//! End-to-end tests of credential attachment and 401 recovery over HTTP.

use mockito::{Matcher, Server};
use serde_json::json;

use aquagreen_client::error::{ApiError, AuthError};
use aquagreen_client::session::SessionStorage;

mod common;

#[tokio::test]
async fn test_bearer_header_matches_session_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/excel-files/")
        .match_header("authorization", "Bearer access-1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id": 1, "title": "plots"}]"#)
        .expect(1)
        .create_async()
        .await;

    let t = common::client_for(&server.url(), true);
    let files = t.client.list_files().await.unwrap();

    assert_eq!(files.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_no_header_without_session() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/csv-files/")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_body("[]")
        .expect(1)
        .create_async()
        .await;

    let t = common::client_for(&server.url(), false);
    assert!(t.client.list_csv_files().await.unwrap().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/api/excel-files/")
        .match_header("authorization", "Bearer access-1")
        .with_status(401)
        .with_body(r#"{"detail": "Given token not valid for any token type"}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/token/refresh/")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"refresh": "refresh-1"})))
        .with_status(200)
        .with_body(r#"{"access": "access-2"}"#)
        .expect(1)
        .create_async()
        .await;
    let replay = server
        .mock("GET", "/api/excel-files/")
        .match_header("authorization", "Bearer access-2")
        .with_status(200)
        .with_body(r#"[{"id": 3, "title": "yields"}]"#)
        .expect(1)
        .create_async()
        .await;

    let t = common::client_for(&server.url(), true);
    let files = t.client.list_files().await.unwrap();

    assert_eq!(files[0].title, "yields");
    rejected.assert_async().await;
    refresh.assert_async().await;
    replay.assert_async().await;

    assert_eq!(t.session.access_token().unwrap().as_str(), "access-2");
    assert_eq!(t.session.refresh_token().unwrap().as_str(), "refresh-1");
    let stored = t.reopen_storage();
    assert_eq!(stored.get("token").as_deref(), Some("access-2"));
    assert_eq!(stored.get("refreshToken").as_deref(), Some("refresh-1"));
    assert!(t.client.snapshot().last_error.is_none());
}

#[tokio::test]
async fn test_failed_refresh_clears_persisted_session() {
    let mut server = Server::new_async().await;
    let rejected = server
        .mock("GET", "/api/excel-files/")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/token/refresh/")
        .with_status(401)
        .with_body(r#"{"detail": "Token is invalid or expired", "code": "token_not_valid"}"#)
        .expect(1)
        .create_async()
        .await;

    let t = common::client_for(&server.url(), true);
    let err = t.client.list_files().await.unwrap_err();

    assert!(matches!(
        err,
        ApiError::SessionExpired(AuthError::RefreshRejected { .. })
    ));
    rejected.assert_async().await;
    refresh.assert_async().await;

    assert!(!t.session.is_authenticated());
    let stored = t.reopen_storage();
    for key in ["token", "refreshToken", "user"] {
        assert!(stored.get(key).is_none(), "{key} survived");
    }
    assert_eq!(
        t.client.snapshot().last_error.as_deref(),
        Some("Session expired. Please log in again.")
    );
}

#[tokio::test]
async fn test_second_unauthorized_is_not_refreshed_again() {
    let mut server = Server::new_async().await;
    let protected = server
        .mock("DELETE", "/api/excel-files/4/")
        .with_status(401)
        .expect(2)
        .create_async()
        .await;
    let refresh = server
        .mock("POST", "/api/auth/token/refresh/")
        .with_status(200)
        .with_body(r#"{"access": "access-2"}"#)
        .expect(1)
        .create_async()
        .await;

    let t = common::client_for(&server.url(), true);
    let id = aquagreen_client::api::parse_resource_id("4").unwrap();
    let err = t.client.delete_file(id).await.unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(401));
    protected.assert_async().await;
    refresh.assert_async().await;
    assert!(t.session.is_authenticated());
}

#[tokio::test]
async fn test_login_persists_session_for_next_start() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/api/auth/login/")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"username": "grower", "password": "pw"})))
        .with_status(200)
        .with_body(
            r#"{"access": "A", "refresh": "R", "user": {"id": 7, "username": "grower"}, "success": true}"#,
        )
        .expect(1)
        .create_async()
        .await;

    let t = common::client_for(&server.url(), false);
    t.client
        .login(&aquagreen_client::api::Credentials {
            username: "grower".into(),
            password: "pw".into(),
        })
        .await
        .unwrap();
    login.assert_async().await;

    let storage = std::sync::Arc::new(t.reopen_storage());
    let restored = aquagreen_client::SessionContext::restore(storage);
    assert_eq!(restored.access_token().unwrap().as_str(), "A");
    assert_eq!(restored.refresh_token().unwrap().as_str(), "R");
    assert_eq!(restored.profile().unwrap().0["id"], 7);
}
