//! Liveness check that also pings the database.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tracing::warn;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthResponse)))]
pub struct HealthApi;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when the database does not answer.
    pub status: &'static str,
    /// `up` or `down`.
    pub database: &'static str,
    /// Open pool connections.
    pub connections: u32,
    pub version: &'static str,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Database reachable", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let reachable = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "health check: database unreachable");
            false
        }
    };
    let (status, label, database) = if reachable {
        (StatusCode::OK, "ok", "up")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "down")
    };
    let body = HealthResponse {
        status: label,
        database,
        connections: state.pool.size(),
        version: env!("CARGO_PKG_VERSION"),
    };
    (status, Json(body))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::test_support;

    #[tokio::test]
    async fn reports_database_state() {
        let pool = test_support::pool_with_members(&[]).await;
        let state = Arc::new(AppState::new(Config::default(), pool));

        let (status, Json(body)) = get_health(State(state.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!((body.status, body.database), ("ok", "up"));

        state.pool.close().await;
        let (status, Json(body)) = get_health(State(state)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.database, "down");
    }
}
