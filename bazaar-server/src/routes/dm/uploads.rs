use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use tracing::debug;
use utoipa::OpenApi;

use crate::error::DmError;
use crate::schemas::dm::upload::UploadResponse;
use crate::state::AppState;
use crate::uploads::AttachmentStore;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";

#[derive(OpenApi)]
#[openapi(paths(upload_file), components(schemas(UploadResponse)))]
pub struct UploadsApi;

/// Register the upload route, capping request bodies at `max_bytes`.
pub fn router(max_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(max_bytes))
}

/// Store an attachment and return the URL to reference it by.
///
/// The file is read from the `file` field of a multipart/form-data body.
/// Bodies larger than `BAZAAR_MAX_UPLOAD_BYTES` are rejected.
#[utoipa::path(
    post,
    path = "/api/dm/upload",
    tag = "uploads",
    request_body(content_type = "multipart/form-data", description = "Form with a single `file` field"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "Missing, empty or oversized file"),
        (status = 500, description = "Write failed"),
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, DmError> {
    let max_bytes = state.config.max_upload_bytes;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DmError::Validation(format!("failed to read multipart field: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_owned();

        let mut bytes: Vec<u8> = Vec::new();
        let mut stream = field;
        while let Some(chunk) = stream
            .chunk()
            .await
            .map_err(|e| DmError::Validation(format!("failed to read file chunk: {e}")))?
        {
            bytes.extend_from_slice(&chunk);
            if bytes.len() > max_bytes {
                return Err(DmError::Validation(format!(
                    "file too large: exceeds maximum of {max_bytes} bytes"
                )));
            }
        }

        debug!(file = %file_name, size = bytes.len(), "upload received");
        let url = state.attachments.store(&file_name, &bytes).await?;
        return Ok(Json(UploadResponse { url }));
    }

    Err(DmError::Validation("missing `file` field".into()))
}
