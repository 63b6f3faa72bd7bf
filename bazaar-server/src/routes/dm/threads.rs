use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::auth::Identity;
use crate::error::DmError;
use crate::schemas::dm::member::MemberResponse;
use crate::schemas::dm::message::MarkReadRequest;
use crate::schemas::dm::thread::{
    CounterpartLiteral, ListThreadsQuery, OpenThreadRequest, ThreadResponse,
};
use crate::schemas::dm::{Data, StatusMessage};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(open_thread, list_threads, delete_thread, mark_read),
    components(schemas(
        OpenThreadRequest,
        CounterpartLiteral,
        ThreadResponse,
        MemberResponse,
        MarkReadRequest,
        StatusMessage
    ))
)]
pub struct ThreadsApi;

/// Register thread routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/threads/open", post(open_thread))
        .route("/threads", get(list_threads))
        .route("/threads/{id}", delete(delete_thread))
        .route("/threads/{id}/read", patch(mark_read))
}

/// Open the thread with another member, creating it on first contact.
#[utoipa::path(
    post,
    path = "/api/dm/threads/open",
    tag = "threads",
    request_body = OpenThreadRequest,
    responses(
        (status = 200, description = "Existing or newly created thread", body = Data<ThreadResponse>),
        (status = 400, description = "Invalid request or thread with self"),
        (status = 401, description = "No acting member"),
        (status = 403, description = "Declared member does not match identity"),
        (status = 404, description = "Member not found"),
    )
)]
pub async fn open_thread(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    payload: Result<Json<OpenThreadRequest>, JsonRejection>,
) -> Result<Json<Data<ThreadResponse>>, DmError> {
    let Json(req) = payload?;
    let requester = state.guard.reconcile_actor(req.current_user_id, identity)?;
    let thread = state
        .threads
        .open_or_create(requester, &req.friend_username.to_string())
        .await?;
    Ok(Json(Data::new(thread.to_response())))
}

/// Threads the member participates in, most recently active first.
#[utoipa::path(
    get,
    path = "/api/dm/threads",
    tag = "threads",
    params(ListThreadsQuery),
    responses(
        (status = 200, description = "Thread list", body = Data<Vec<ThreadResponse>>),
        (status = 401, description = "No acting member"),
        (status = 403, description = "Declared member does not match identity"),
    )
)]
pub async fn list_threads(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    query: Result<Query<ListThreadsQuery>, QueryRejection>,
) -> Result<Json<Data<Vec<ThreadResponse>>>, DmError> {
    let Query(query) = query?;
    let member_id = state.guard.reconcile_actor(query.member_id, identity)?;
    let threads = state.threads.list(member_id).await?;
    Ok(Json(Data::new(threads.iter().map(|t| t.to_response()).collect())))
}

#[utoipa::path(
    delete,
    path = "/api/dm/threads/{id}",
    tag = "threads",
    params(("id" = i64, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Thread deleted", body = StatusMessage),
        (status = 401, description = "No identity"),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Thread not found"),
    )
)]
pub async fn delete_thread(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<i64>,
) -> Result<Json<StatusMessage>, DmError> {
    let caller = state.guard.require_identity(identity)?;
    state.threads.delete(id, caller).await?;
    Ok(Json(StatusMessage::deleted()))
}

/// Mark every message the member received in the thread as read.
#[utoipa::path(
    patch,
    path = "/api/dm/threads/{id}/read",
    tag = "threads",
    params(("id" = i64, Path, description = "Thread id")),
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Messages marked read", body = StatusMessage),
        (status = 401, description = "No acting member"),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Thread not found"),
    )
)]
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<i64>,
    payload: Result<Option<Json<MarkReadRequest>>, JsonRejection>,
) -> Result<Json<StatusMessage>, DmError> {
    let req = payload?.map(|Json(req)| req).unwrap_or_default();
    let member_id = state.guard.reconcile_actor(req.member_id, identity)?;
    state.receipts.mark_read(id, member_id).await?;
    Ok(Json(StatusMessage::ok()))
}
