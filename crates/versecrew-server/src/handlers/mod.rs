//! HTTP route handlers for the verse server.

pub mod runs;
pub mod verse;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}
