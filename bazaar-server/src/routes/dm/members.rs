use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;
use validator::Validate;

use crate::error::DmError;
use crate::members::{MemberDirectory, SEARCH_LIMIT};
use crate::schemas::dm::Data;
use crate::schemas::dm::member::{MemberResponse, SearchQuery};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(search_members), components(schemas(MemberResponse)))]
pub struct MembersApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/users/search", get(search_members))
}

/// Members whose username starts with `q`, at most ten.
#[utoipa::path(
    get,
    path = "/api/dm/users/search",
    tag = "members",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching members", body = Data<Vec<MemberResponse>>),
        (status = 400, description = "Blank query"),
    )
)]
pub async fn search_members(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Data<Vec<MemberResponse>>>, DmError> {
    let Query(query) = query?;
    query.validate()?;
    let prefix = query.q.as_deref().map(str::trim).unwrap_or_default();
    if prefix.is_empty() {
        return Err(DmError::Validation("query `q` is required".into()));
    }

    let members = state.members.search_prefix(prefix, SEARCH_LIMIT).await?;
    Ok(Json(Data::new(members.iter().map(|m| m.to_response()).collect())))
}
