//! Listing, search and rating routes.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::api_error::{blocking, success, ApiError, Envelope};
use super::client_identity::ClientIdentity;
use super::metrics;
use super::pagination::{paginate, PageQuery};
use super::state::ServerState;
use crate::song_store::{Song, StoreError, ValidationError};

#[derive(Deserialize)]
struct SearchQuery {
    title: Option<String>,
}

#[derive(Serialize)]
struct RatedSong {
    #[serde(flatten)]
    song: Song,
    rating_change: String,
}

async fn list_songs(
    State(state): State<ServerState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let sync = state.synchronizer.clone();
    let listing = blocking(move || Ok(sync.get_listing()?)).await?;
    debug!(
        "Listing {} songs from {:?}",
        listing.songs.len(),
        listing.source
    );
    let page = paginate(listing.songs, &query, &state.config.pagination)?;
    Ok(success(page))
}

async fn search_songs(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let term = query.title.unwrap_or_default().trim().to_string();
    if term.is_empty() {
        return Err(ApiError::BadRequest("Search term is required".to_string()));
    }

    let store = state.synchronizer.store().clone();
    let needle = term.clone();
    let results = blocking(move || Ok(store.search_by_title(&needle)?)).await?;

    if results.is_empty() {
        let body = Envelope::error(json!({
            "search_term": term,
            "total_results": 0,
            "message": "No songs found matching the title",
        }));
        return Ok((StatusCode::NOT_FOUND, Json(body)).into_response());
    }

    Ok(success(json!({
        "search_term": term,
        "total_results": results.len(),
        "results": results,
    })))
}

/// A non-blank string id, or an integer id in its decimal form.
fn payload_song_id(payload: &Value) -> Option<String> {
    match payload.get("song_id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Integers, integral floats and integer strings are accepted.
fn payload_rating(payload: &Value) -> Result<i64, ValidationError> {
    let raw = match payload.get("rating") {
        None | Some(Value::Null) => return Err(ValidationError::MissingField { field: "rating" }),
        Some(raw) => raw,
    };
    let not_integer = || ValidationError::RatingNotInteger {
        raw: raw.to_string(),
    };
    match raw {
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(i),
            (None, Some(f)) if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                Ok(f as i64)
            }
            _ => Err(not_integer()),
        },
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| not_integer()),
        _ => Err(not_integer()),
    }
}

async fn rate_song(
    State(state): State<ServerState>,
    identity: ClientIdentity,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    // A body that is not JSON counts as an empty payload.
    let payload = payload.map(|Json(v)| v).unwrap_or(Value::Null);

    let song_id = payload_song_id(&payload).ok_or_else(|| {
        ApiError::from(StoreError::Validation(ValidationError::MissingField {
            field: "song_id",
        }))
    })?;

    if let Err(limited) = state.rate_limiter.check(identity.as_str(), &song_id) {
        metrics::record_rate_limit_hit("rate");
        return Err(limited.into());
    }

    let rating = payload_rating(&payload).map_err(StoreError::from)?;

    let sync = state.synchronizer.clone();
    let target = song_id.clone();
    let change = blocking(move || Ok(sync.apply_rating(&target, rating)?)).await;

    match change {
        Ok(change) => {
            let rating_change = change.describe();
            Ok(success(RatedSong {
                song: change.song,
                rating_change,
            }))
        }
        Err(ApiError::NotFound(message)) => {
            let body = Envelope::error(json!({ "message": message, "song_id": song_id }));
            Ok((StatusCode::NOT_FOUND, Json(body)).into_response())
        }
        Err(err) => Err(err),
    }
}

pub fn make_songs_routes(state: ServerState) -> Router {
    Router::new()
        .route("/songs/", get(list_songs))
        .route("/songs/search/", get(search_songs))
        .route("/songs/rate/", put(rate_song))
        .with_state(state)
}
