//! Bulk JSON upload route.

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::Response,
    routing::post,
    Router,
};
use tracing::{debug, info, warn};

use super::api_error::{blocking, success, ApiError};
use super::state::ServerState;
use crate::config::UploadSettings;
use crate::song_import::parse_upload;

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn file_too_large(settings: &UploadSettings) -> ApiError {
    let max_mb = settings.max_file_size_bytes as f64 / (1024.0 * 1024.0);
    ApiError::BadRequest(format!("File too large. Maximum size is {}MB", max_mb))
}

struct UploadedFile {
    name: String,
    data: Vec<u8>,
}

async fn read_file_field(
    multipart: &mut Multipart,
    settings: &UploadSettings,
) -> Result<Option<UploadedFile>, ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Ok(None),
            Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                return Err(file_too_large(settings))
            }
            Err(err) => {
                warn!("Failed to read multipart body: {}", err);
                return Ok(None);
            }
        };
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        return match field.bytes().await {
            Ok(bytes) => Ok(Some(UploadedFile {
                name,
                data: bytes.to_vec(),
            })),
            Err(err) if err.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(file_too_large(settings))
            }
            Err(err) => {
                warn!("Failed to read uploaded file: {}", err);
                Err(ApiError::BadRequest("Failed to read uploaded file".to_string()))
            }
        };
    }
}

async fn upload_json(
    State(state): State<ServerState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let settings = &state.config.upload;
    let file = match multipart {
        Ok(mut multipart) => read_file_field(&mut multipart, settings).await?,
        Err(rejection) => {
            debug!("Upload is not a multipart form: {}", rejection);
            None
        }
    }
    .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;

    if !file.name.ends_with(".json") {
        return Err(ApiError::BadRequest(
            "Invalid file type. Only .json files are allowed".to_string(),
        ));
    }
    if file.data.len() > settings.max_file_size_bytes {
        return Err(file_too_large(settings));
    }
    debug!("Received {} ({} bytes)", file.name, file.data.len());

    let rows = parse_upload(&file.data)?;
    let importer = state.importer.clone();
    let summary = blocking(move || Ok(importer.import_rows(&rows)?)).await?;
    info!(
        "Imported {}: {} processed, {} skipped",
        file.name, summary.processed_records, summary.skipped_records
    );
    Ok(success(summary))
}

pub fn make_upload_routes(state: ServerState) -> Router {
    let body_limit = state.config.upload.max_file_size_bytes + MULTIPART_OVERHEAD_BYTES;
    Router::new()
        .route("/songs/upload-json/", post(upload_json))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
