//! Request identity.
//!
//! [`Identity`] is an extractor: handlers take it as an argument and get the
//! member id resolved from the request credentials, or `None`.

pub mod guard;
pub mod identity;

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

pub use guard::AccessGuard;
pub use identity::{Credentials, IdentityResolver};

use crate::db::MemberId;
use crate::state::AppState;

/// Development header carrying a raw member id.
pub const DEV_USER_HEADER: &str = "x-user-id";

/// Request extension attached by the verified-token middleware.
#[derive(Debug, Clone)]
pub struct VerifiedMember {
    pub member_id: MemberId,
    pub username: String,
}

/// The member id resolved for the current request, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity(pub Option<MemberId>);

impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let creds = Credentials {
            verified_id: parts
                .extensions
                .get::<VerifiedMember>()
                .map(|v| v.member_id),
            dev_header: header(DEV_USER_HEADER),
            authorization: header(AUTHORIZATION.as_str()),
        };
        Ok(Identity(state.identity.resolve(&creds)))
    }
}
