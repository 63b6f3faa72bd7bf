//! HTTP request and response bodies.

pub mod dm;
