//! Document upload route.

use std::path::Path;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    routing::post,
};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::UploadResponse;
use crate::api::server::AppState;

/// Slack added on top of the configured upload cap so the multipart framing
/// itself never trips the transport body limit; the handler's own size check
/// produces the canonical 413.
const BODY_LIMIT_SLACK: usize = 1024 * 1024;

/// Create the upload router.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(upload_file))
        .layer(DefaultBodyLimit::max(
            state.config.max_upload_bytes + BODY_LIMIT_SLACK,
        ))
}

/// Map a multipart read failure to the API error space. Bodies that exhaust
/// the transport limit surface here as a 413 from the extractor rather than
/// reaching the handler's own size check.
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("File too large. Maximum size is 100MB")
    } else {
        ApiError::bad_request(format!("Invalid multipart body: {err}"))
    }
}

/// Extension of the uploaded filename, dot included, for the temp file.
fn filename_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{ext}"))
        .unwrap_or_default()
}

/// Handle a document upload: extract text, segment into chapters, persist
/// the task record and return the task id with the chapter titles.
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut file_part: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|name| name.trim().to_string())
            .unwrap_or_default();
        if filename.is_empty() {
            return Err(ApiError::bad_request("No file name provided"));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        file_part = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = file_part else {
        return Err(ApiError::bad_request("No file name provided"));
    };

    if bytes.len() > state.config.max_upload_bytes {
        return Err(ApiError::payload_too_large(
            "File too large. Maximum size is 100MB",
        ));
    }

    // Scoped temporary file; the guard deletes it on every exit path.
    let temp_file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&filename_extension(&filename))
        .tempfile_in(&state.config.upload_dir)
        .map_err(|e| ApiError::internal(format!("Error saving file: {e}")))?;
    tokio::fs::write(temp_file.path(), &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Error saving file: {e}")))?;

    let content = state.file_processor.extract_text(temp_file.path()).await?;
    let chapters = state.ai_processor.segment_chapters(&content).await?;

    let task_id = uuid::Uuid::new_v4().to_string();
    state
        .task_repository
        .store_task(&task_id, &filename, &chapters)
        .await?;

    info!(
        task_id = %task_id,
        filename = %filename,
        chapters = chapters.len(),
        "Upload processed"
    );

    Ok(Json(UploadResponse { task_id, chapters }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_extension() {
        assert_eq!(filename_extension("doc.txt"), ".txt");
        assert_eq!(filename_extension("archive.tar.gz"), ".gz");
        assert_eq!(filename_extension("no_extension"), "");
    }
}
