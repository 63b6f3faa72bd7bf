use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch};
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::auth::Identity;
use crate::error::DmError;
use crate::schemas::dm::message::{
    AttachmentInput, AttachmentResponse, EditMessageRequest, MessageResponse, PageQuery,
    PostMessageRequest,
};
use crate::schemas::dm::{Data, StatusMessage};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(list_messages, post_message, edit_message, delete_message),
    components(schemas(
        AttachmentInput,
        AttachmentResponse,
        PostMessageRequest,
        EditMessageRequest,
        MessageResponse
    ))
)]
pub struct MessagesApi;

/// Register message routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/threads/{id}/messages", get(list_messages).post(post_message))
        .route("/messages/{id}", patch(edit_message).delete(delete_message))
}

/// A page of the thread's messages, oldest first.
///
/// Membership is enforced when the request carries an identity.
#[utoipa::path(
    get,
    path = "/api/dm/threads/{id}/messages",
    tag = "messages",
    params(("id" = i64, Path, description = "Thread id"), PageQuery),
    responses(
        (status = 200, description = "Message page", body = Data<Vec<MessageResponse>>),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Thread not found"),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<i64>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Data<Vec<MessageResponse>>>, DmError> {
    let Query(page) = query?;
    state.guard.authorize_reader(id, identity).await?;
    let messages = state.messages.list(id, page.offset, page.limit).await?;
    Ok(Json(Data::new(messages.iter().map(|m| m.to_response()).collect())))
}

#[utoipa::path(
    post,
    path = "/api/dm/threads/{id}/messages",
    tag = "messages",
    params(("id" = i64, Path, description = "Thread id")),
    request_body = PostMessageRequest,
    responses(
        (status = 200, description = "Message posted", body = Data<MessageResponse>),
        (status = 400, description = "Empty message or unknown attachment type"),
        (status = 401, description = "No acting member"),
        (status = 403, description = "Not a participant or sender mismatch"),
        (status = 404, description = "Thread not found"),
    )
)]
pub async fn post_message(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<i64>,
    payload: Result<Json<PostMessageRequest>, JsonRejection>,
) -> Result<Json<Data<MessageResponse>>, DmError> {
    let Json(req) = payload?;
    let sender = state.guard.reconcile_actor(req.sender_id, identity)?;
    let attachments = req
        .attachments
        .iter()
        .map(AttachmentInput::to_new_attachment)
        .collect::<Result<Vec<_>, _>>()?;

    let message = state
        .messages
        .post(id, sender, &req.content, attachments)
        .await?;
    Ok(Json(Data::new(message.to_response())))
}

/// Replace a message's content. Only its sender may do this.
#[utoipa::path(
    patch,
    path = "/api/dm/messages/{id}",
    tag = "messages",
    params(("id" = i64, Path, description = "Message id")),
    request_body = EditMessageRequest,
    responses(
        (status = 200, description = "Message edited", body = Data<MessageResponse>),
        (status = 400, description = "Empty content"),
        (status = 401, description = "No identity"),
        (status = 403, description = "Not the sender"),
        (status = 404, description = "Message not found"),
    )
)]
pub async fn edit_message(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<i64>,
    payload: Result<Json<EditMessageRequest>, JsonRejection>,
) -> Result<Json<Data<MessageResponse>>, DmError> {
    let caller = state.guard.require_identity(identity)?;
    let Json(req) = payload?;
    let message = state.messages.edit(id, caller, &req.content).await?;
    Ok(Json(Data::new(message.to_response())))
}

#[utoipa::path(
    delete,
    path = "/api/dm/messages/{id}",
    tag = "messages",
    params(("id" = i64, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message deleted", body = StatusMessage),
        (status = 401, description = "No identity"),
        (status = 403, description = "Not the sender"),
        (status = 404, description = "Message not found"),
    )
)]
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    Identity(identity): Identity,
    Path(id): Path<i64>,
) -> Result<Json<StatusMessage>, DmError> {
    let caller = state.guard.require_identity(identity)?;
    state.messages.delete(id, caller).await?;
    Ok(Json(StatusMessage::deleted()))
}
