//! Direct-messaging routes, nested under `/api/dm`.

pub mod members;
pub mod messages;
pub mod threads;
pub mod uploads;

use std::sync::Arc;

use axum::Router;
use utoipa::OpenApi;

use crate::state::AppState;

pub fn router(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .merge(threads::router())
        .merge(messages::router())
        .merge(members::router())
        .merge(uploads::router(max_upload_bytes))
}

#[derive(OpenApi)]
#[openapi(tags(
    (name = "threads", description = "One conversation per member pair"),
    (name = "messages", description = "Messages inside a thread"),
))]
pub struct DmApi;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = DmApi::openapi();
    spec.merge(threads::ThreadsApi::openapi());
    spec.merge(messages::MessagesApi::openapi());
    spec.merge(members::MembersApi::openapi());
    spec.merge(uploads::UploadsApi::openapi());
    spec
}

// ── Tests ──────────────────────────────────────────────────────────────────────
