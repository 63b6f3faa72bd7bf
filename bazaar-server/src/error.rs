//! Unified DM error type.
//!
//! Every service call and handler returns `Result<T, DmError>`, which
//! implements [`axum::response::IntoResponse`] so errors are automatically
//! converted to a `{"error": "..."}` body with an appropriate status code.
//!
//! **Security note:** storage and internal errors are logged with full
//! detail but only a generic message is returned to the caller so that SQL
//! or file paths never leak to clients.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// All errors that can occur while serving a DM request.
#[derive(Debug, Error)]
pub enum DmError {
    /// Malformed or missing input.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A thread or friend link was requested between a member and itself.
    #[error("self reference: {0}")]
    SelfReference(String),

    /// A thread, message or member does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is known but not allowed to perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// No identity could be resolved where one is required.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Propagated from the SQLite store.
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    /// Unclassified failure outside the store (e.g. upload I/O).
    #[error("internal error: {0}")]
    Internal(String),
}

impl DmError {
    pub fn status(&self) -> StatusCode {
        match self {
            DmError::Validation(_) | DmError::SelfReference(_) => StatusCode::BAD_REQUEST,
            DmError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            DmError::Forbidden(_) => StatusCode::FORBIDDEN,
            DmError::NotFound(_) => StatusCode::NOT_FOUND,
            DmError::Storage(_) | DmError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for DmError {
    fn into_response(self) -> Response {
        let status = self.status();
        let client_message = match &self {
            DmError::Validation(m)
            | DmError::SelfReference(m)
            | DmError::NotFound(m)
            | DmError::Forbidden(m)
            | DmError::Unauthenticated(m) => m.clone(),

            DmError::Storage(e) => {
                error!(error = %e, "storage error");
                "internal server error".to_owned()
            }
            DmError::Internal(m) => {
                error!(message = %m, "internal server error");
                "internal server error".to_owned()
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<JsonRejection> for DmError {
    fn from(rejection: JsonRejection) -> Self {
        DmError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for DmError {
    fn from(rejection: QueryRejection) -> Self {
        DmError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for DmError {
    /// Names the offending fields only; rejected values stay out of the body.
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .keys()
            .map(|field| field.to_string())
            .collect();
        fields.sort();
        DmError::Validation(format!("invalid field: {}", fields.join(", ")))
    }
}

impl From<std::io::Error> for DmError {
    fn from(e: std::io::Error) -> Self {
        DmError::Internal(e.to_string())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_mapping_follows_taxonomy() {
        assert_eq!(DmError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(DmError::SelfReference("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(DmError::Unauthenticated("x".into()).status(), StatusCode::UNAUTHORIZED);
        assert_eq!(DmError::Forbidden("x".into()).status(), StatusCode::FORBIDDEN);
        assert_eq!(DmError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            DmError::Storage(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_errors_name_fields_without_values() {
        use validator::Validate;

        #[derive(Validate)]
        struct Listing {
            #[validate(length(max = 4))]
            title: String,
        }

        let rejected = "a very long listing title".to_owned();
        let err = DmError::from(Listing { title: rejected.clone() }.validate().unwrap_err());
        let DmError::Validation(message) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(message, "invalid field: title");
        assert!(!message.contains(&rejected));
    }

    #[tokio::test]
    async fn storage_errors_do_not_leak_detail() {
        use http_body_util::BodyExt;

        let resp = DmError::Storage(sqlx::Error::Protocol("near \"SELEC\": syntax".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "internal server error");
    }
}
