use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Response of `POST /upload`: the URL to reference in a message attachment.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    pub url: String,
}
