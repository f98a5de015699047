//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per song catalog endpoint.
//! When API routes or request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Listing and Search
    // ========================================================================

    pub async fn list_songs(&self) -> Response {
        self.list_songs_with_query(&[]).await
    }

    pub async fn list_songs_with_query(&self, query: &[(&str, &str)]) -> Response {
        self.client
            .get(format!("{}/songs/", self.base_url))
            .query(query)
            .send()
            .await
            .expect("List songs request failed")
    }

    pub async fn search(&self, title: &str) -> Response {
        self.client
            .get(format!("{}/songs/search/", self.base_url))
            .query(&[("title", title)])
            .send()
            .await
            .expect("Search request failed")
    }

    // ========================================================================
    // Rating
    // ========================================================================

    pub async fn rate(&self, song_id: &str, rating: i64) -> Response {
        self.rate_with_payload(json!({ "song_id": song_id, "rating": rating }))
            .await
    }

    pub async fn rate_with_payload(&self, payload: Value) -> Response {
        self.client
            .put(format!("{}/songs/rate/", self.base_url))
            .json(&payload)
            .send()
            .await
            .expect("Rate request failed")
    }

    // ========================================================================
    // Upload
    // ========================================================================

    pub async fn upload_json(&self, document: &Value) -> Response {
        self.upload_file("songs.json", document.to_string().into_bytes())
            .await
    }

    pub async fn upload_file(&self, file_name: &str, content: Vec<u8>) -> Response {
        let part = Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str("application/json")
            .expect("Invalid mime type");
        self.upload_form(Form::new().part("file", part)).await
    }

    pub async fn upload_form(&self, form: Form) -> Response {
        self.client
            .post(format!("{}/songs/upload-json/", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }
}
