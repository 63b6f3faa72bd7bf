use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::db::to_rfc3339;
use crate::entities::ThreadView;
use crate::schemas::dm::member::MemberResponse;

/// Counterpart of an open-thread request: a member id or a username.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum CounterpartLiteral {
    Id(i64),
    Name(String),
}

impl fmt::Display for CounterpartLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CounterpartLiteral::Id(id) => write!(f, "{id}"),
            CounterpartLiteral::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OpenThreadRequest {
    /// Declared requester. Must match the resolved identity when both exist.
    pub current_user_id: Option<i64>,
    /// Id or username of the other member.
    pub friend_username: CounterpartLiteral,
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListThreadsQuery {
    pub member_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThreadResponse {
    pub id: i64,
    pub user_a_id: i64,
    pub user_b_id: i64,
    pub user_a: MemberResponse,
    pub user_b: MemberResponse,
    pub last_activity_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl ThreadView {
    pub fn to_response(&self) -> ThreadResponse {
        ThreadResponse {
            id: self.thread.id,
            user_a_id: self.thread.user_a_id,
            user_b_id: self.thread.user_b_id,
            user_a: self.user_a.to_response(),
            user_b: self.user_b.to_response(),
            last_activity_at: self.thread.last_activity_at.map(to_rfc3339),
            created_at: to_rfc3339(self.thread.created_at),
            updated_at: to_rfc3339(self.thread.updated_at),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counterpart_accepts_number_or_string() {
        let req: OpenThreadRequest =
            serde_json::from_str(r#"{"currentUserId": 10, "friendUsername": 20}"#).unwrap();
        assert_eq!(req.friend_username, CounterpartLiteral::Id(20));
        assert_eq!(req.friend_username.to_string(), "20");

        let req: OpenThreadRequest =
            serde_json::from_str(r#"{"friendUsername": "alice"}"#).unwrap();
        assert_eq!(req.current_user_id, None);
        assert_eq!(req.friend_username.to_string(), "alice");
    }
}
