//! HTTP/REST API layer for `workflow-cli serve`.
//!
//! Axum-based REST API at `/api/v1/` with an envelope response format and
//! CORS support. Workflow analysis is stateless; debug sessions live in the
//! shared in-memory store.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
