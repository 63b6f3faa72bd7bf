//! Verified-token middleware.
//!
//! When a JWT secret is configured, a bearer token signed by the account
//! service is verified here and the member it names is attached to the
//! request as a [`VerifiedMember`] extension. Tokens that fail verification
//! are ignored rather than rejected, so development credentials further down
//! the identity chain keep working.

use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::{Credentials, VerifiedMember};
use crate::db::MemberId;
use crate::state::AppState;

/// Clock skew tolerated when checking `exp`, in seconds.
const LEEWAY_SECS: u64 = 30;

/// Claims carried by account-service access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberClaims {
    pub member_id: MemberId,
    pub username: String,
    pub exp: usize,
}

#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .field("leeway", &self.validation.leeway)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// HS256 verifier for `secret`.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = LEEWAY_SECS;
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<VerifiedMember, jsonwebtoken::errors::Error> {
        let data = decode::<MemberClaims>(token, &self.key, &self.validation)?;
        Ok(VerifiedMember {
            member_id: data.claims.member_id,
            username: data.claims.username,
        })
    }
}

pub async fn verify_member_token(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(verifier) = &state.tokens {
        let creds = Credentials {
            authorization: req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned),
            ..Default::default()
        };
        if let Some(token) = creds.bearer_token() {
            match verifier.verify(token) {
                Ok(member) => {
                    debug!(member_id = member.member_id, username = %member.username, "bearer token verified");
                    req.extensions_mut().insert(member);
                }
                Err(e) => debug!(error = %e, "bearer token not verified; continuing"),
            }
        }
    }
    next.run(req).await
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{Extension, Router, middleware};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use tower::ServiceExt;
    use tracing_test::traced_test;

    use crate::config::Config;
    use crate::test_support;

    fn sign(secret: &str, member_id: MemberId, exp_offset: i64) -> String {
        let exp = (chrono::Utc::now().timestamp() + exp_offset) as usize;
        let claims = MemberClaims {
            member_id,
            username: format!("member{member_id}"),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_member() {
        let verifier = TokenVerifier::new("s3cret");
        let member = verifier.verify(&sign("s3cret", 42, 600)).unwrap();
        assert_eq!(member.member_id, 42);
        assert_eq!(member.username, "member42");
    }

    #[test]
    fn wrong_secret_and_expired_tokens_fail() {
        let verifier = TokenVerifier::new("s3cret");
        assert!(verifier.verify(&sign("other", 42, 600)).is_err());
        assert!(verifier.verify(&sign("s3cret", 42, -600)).is_err());
        assert!(verifier.verify("uid:42").is_err());
    }

    #[test]
    fn leeway_covers_small_clock_skew() {
        let verifier = TokenVerifier::new("s3cret");
        assert!(verifier.verify(&sign("s3cret", 7, -5)).is_ok());
    }

    #[tokio::test]
    #[traced_test]
    async fn middleware_attaches_and_logs_verified_member() {
        let config = Config {
            jwt_secret: Some("s3cret".into()),
            ..Config::default()
        };
        let pool = test_support::pool_with_members(&[]).await;
        let state = Arc::new(AppState::new(config, pool));
        let app = Router::new()
            .route(
                "/",
                get(|Extension(member): Extension<VerifiedMember>| async move {
                    member.member_id.to_string()
                }),
            )
            .layer(middleware::from_fn_with_state(state, verify_member_token));

        let req = HttpRequest::builder()
            .uri("/")
            .header(AUTHORIZATION, format!("Bearer {}", sign("s3cret", 9, 600)))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(logs_contain("username=member9"));
    }
}
