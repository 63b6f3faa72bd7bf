//! HTTP middleware stack: request tracing, CORS and bearer-token verification.

pub mod auth;
pub mod cors;
pub mod trace;
