//! JSON bodies for the `/api/dm` routes. Every field is camelCase on the wire.

pub mod member;
pub mod message;
pub mod thread;
pub mod upload;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Success envelope: `{"data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Data<T> {
    pub data: T,
}

impl<T> Data<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Acknowledgement body, e.g. `{"message": "deleted"}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    pub fn deleted() -> Self {
        Self {
            message: "deleted".to_owned(),
        }
    }

    pub fn ok() -> Self {
        Self {
            message: "ok".to_owned(),
        }
    }
}
