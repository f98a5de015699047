//! End-to-end tests for bulk JSON upload

mod common;

use common::*;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn error_message(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");
    body["data"]["message"].as_str().unwrap().to_string()
}

// =============================================================================
// Successful Imports
// =============================================================================

#[tokio::test]
async fn test_upload_column_oriented_export() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.upload_json(&column_oriented_upload()).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"]["processed_records"], 3);
    assert_eq!(body["data"]["skipped_records"], 0);
    assert_eq!(body["data"]["total_records"], 3);
    assert!(body["data"].get("errors").is_none());

    let first = server.stored_song("new-1");
    assert_eq!(first.title, "Imported One");
    assert_eq!(first.rating, None);
    assert_eq!(first.danceability, 0.5);
    assert_eq!(first.song_class, 1);

    let third = server.stored_song("new-3");
    assert_eq!(third.danceability, 0.0);
    assert_eq!(third.loudness, -60.0);
    assert_eq!(third.time_signature, 4);
}

#[tokio::test]
async fn test_upload_refreshes_listing() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    // Warm the cache before the import
    let before: Value = client.list_songs().await.json().await.unwrap();
    assert_eq!(before["data"]["count"], SEEDED_SONG_COUNT);

    let document = json!([{
        "id": {"0": "top-song"},
        "title": {"0": "Top Song"}
    }]);
    assert_eq!(client.upload_json(&document).await.status(), StatusCode::OK);

    let after: Value = client.list_songs().await.json().await.unwrap();
    assert_eq!(after["data"]["count"], SEEDED_SONG_COUNT + 1);
}

#[tokio::test]
async fn test_upload_skips_bad_rows_and_keeps_the_rest() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let document = json!([
        {"song_id": "r1", "title": "Row One", "rating": "abc"},
        {"title": "No identity"},
        {"song_id": "r2", "title": "Row Two", "rating": 4, "tempo": "fast"}
    ]);
    let response = client.upload_json(&document).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["data"]["processed_records"], 2);
    assert_eq!(body["data"]["skipped_records"], 1);
    assert_eq!(body["data"]["total_records"], 3);
    assert_eq!(
        body["data"]["errors"],
        json!([
            "Row 2 (song_id: N/A): Integrity error - song_id must be a non-empty string or an integer"
        ])
    );

    assert_eq!(server.stored_song("r1").rating, None);
    let second = server.stored_song("r2");
    assert_eq!(second.rating, Some(4));
    assert_eq!(second.tempo, 120.0);
}

#[tokio::test]
async fn test_upload_replaces_existing_song() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let document = json!([{"song_id": SONG_2_ID, "title": "4 Walls (Live)", "rating": 1}]);
    let response = client.upload_json(&document).await;
    assert_eq!(response.status(), StatusCode::OK);

    let song = server.stored_song(SONG_2_ID);
    assert_eq!(song.title, "4 Walls (Live)");
    assert_eq!(song.rating, Some(1));
}

// =============================================================================
// Rejected Uploads
// =============================================================================

#[tokio::test]
async fn test_upload_without_file() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .upload_form(Form::new().text("comment", "no file here"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "No file uploaded");
}

#[tokio::test]
async fn test_upload_wrong_extension() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.upload_file("songs.csv", b"[]".to_vec()).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Invalid file type. Only .json files are allowed"
    );
}

#[tokio::test]
async fn test_upload_too_large() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let content = vec![b' '; 10 * 1024 * 1024 + 1];
    let part = Part::bytes(content).file_name("big.json");
    let response = client.upload_form(Form::new().part("file", part)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "File too large. Maximum size is 10MB"
    );
}

#[tokio::test]
async fn test_upload_invalid_json() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client
        .upload_file("songs.json", b"{not json".to_vec())
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Invalid JSON file format. Could not decode JSON"
    );
}

#[tokio::test]
async fn test_upload_unexpected_shape() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    for document in [json!(42), json!({"title": "no ids"}), json!(["a", "b"])] {
        let response = client.upload_json(&document).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            error_message(response).await,
            "JSON file must contain a list of song objects or a single column-oriented object"
        );
    }
    assert!(server.cache.is_some());
}
