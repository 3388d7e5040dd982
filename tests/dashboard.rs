//! Dashboard actions against a mock backend.

use mockito::{Matcher, Server};
use serde_json::json;

use aquagreen_client::api::{parse_resource_id, FileUpload};
use aquagreen_client::error::ApiError;

mod common;

#[tokio::test]
async fn test_processed_data_envelope_and_bare_list_agree() {
    let mut server = Server::new_async().await;
    let rows = json!([{"plot_id": "P1", "crop": "rice"}, {"plot_id": "P2", "crop": "maize"}]);
    server
        .mock("GET", "/api/processed-data/by_file/")
        .match_query(Matcher::UrlEncoded("file_id".into(), "1".into()))
        .with_status(200)
        .with_body(json!({"success": true, "data": rows.clone()}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", "/api/processed-data/by_file/")
        .match_query(Matcher::UrlEncoded("file_id".into(), "2".into()))
        .with_status(200)
        .with_body(rows.to_string())
        .create_async()
        .await;

    let t = common::client_for(&server.url(), true);
    let from_envelope = t.client.fetch_processed_data(parse_resource_id("1").unwrap()).await;
    let from_bare = t.client.fetch_processed_data(parse_resource_id("2").unwrap()).await;

    assert_eq!(from_envelope.len(), 2);
    assert_eq!(from_envelope, from_bare);
    assert_eq!(t.client.snapshot().processed_data, from_bare);
}

#[tokio::test]
async fn test_processed_data_exhaustion_yields_empty_rows() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/processed-data/by_file/")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(3)
        .create_async()
        .await;

    let t = common::client_for(&server.url(), true);
    let rows = t.client.fetch_processed_data(parse_resource_id("9").unwrap()).await;

    assert!(rows.is_empty());
    mock.assert_async().await;
    let snapshot = t.client.snapshot();
    assert!(snapshot.last_error.is_some());
    assert!(!snapshot.loading);
}

#[test]
fn test_invalid_identifier_short_circuits() {
    for raw in ["", "undefined", "null", "abc"] {
        assert!(matches!(parse_resource_id(raw), Err(ApiError::InvalidId(_))));
    }
}

#[tokio::test]
async fn test_upload_sends_multipart_and_reloads_list() {
    let mut server = Server::new_async().await;
    let upload = server
        .mock("POST", "/api/excel-files/")
        .match_header("content-type", Matcher::Regex("multipart/form-data.*".to_string()))
        .match_header("authorization", "Bearer access-1")
        .with_status(201)
        .with_body(r#"{"id": 11, "title": "Season 2024", "processed": false}"#)
        .expect(1)
        .create_async()
        .await;
    let list = server
        .mock("GET", "/api/excel-files/")
        .with_status(200)
        .with_body(r#"{"count": 1, "results": [{"id": 11, "title": "Season 2024"}]}"#)
        .expect(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("season.xlsx");
    std::fs::write(&path, b"PK\x03\x04").unwrap();

    let t = common::client_for(&server.url(), true);
    let file = t
        .client
        .upload_file(&FileUpload::new("Season 2024", &path))
        .await
        .unwrap();

    assert_eq!(file.id.get(), 11);
    upload.assert_async().await;
    list.assert_async().await;
    assert_eq!(t.client.snapshot().files.len(), 1);
}

#[tokio::test]
async fn test_process_file_error_message_is_recorded() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/excel-files/5/process/")
        .with_status(400)
        .with_body(r#"{"error": "Missing required columns: Variety"}"#)
        .create_async()
        .await;

    let t = common::client_for(&server.url(), true);
    let err = t
        .client
        .process_file(parse_resource_id("5").unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(400));
    assert_eq!(
        t.client.snapshot().last_error.as_deref(),
        Some("Missing required columns: Variety")
    );
}
