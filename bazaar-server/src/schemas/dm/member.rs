use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::entities::MemberSummary;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberResponse {
    pub id: i64,
    pub username: String,
}

/// Query string for `GET /users/search`.
#[derive(Debug, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Username prefix, matched literally.
    #[validate(length(max = 64))]
    pub q: Option<String>,
}

impl MemberSummary {
    pub fn to_response(&self) -> MemberResponse {
        MemberResponse {
            id: self.id,
            username: self.username.clone(),
        }
    }
}
