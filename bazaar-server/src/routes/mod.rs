//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, verified-token identity, per-request trace id)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `BAZAAR_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - Direct-messaging routes under `/api/dm`
//! - Static serving of uploaded attachments under `/uploads`

pub mod doc;
mod dm;
mod health;

use axum::{Router, middleware};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{auth, cors, trace};
use crate::state::AppState;
use crate::uploads::UPLOADS_ROUTE;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .nest("/api/dm", dm::router(state.config.max_upload_bytes));

    let mut app = Router::new()
        .merge(api_router)
        .nest_service(UPLOADS_ROUTE, ServeDir::new(&state.config.upload_dir));

    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // The last layer added runs first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::verify_member_token,
        ))
        .layer(middleware::from_fn(trace::trace_middleware))
        .with_state(state)
}
