//! HTTP server module.
//!
//! Provides the upload endpoint, the health check, and the middleware
//! stack around them.

mod middleware;
pub mod routes;

pub use middleware::{API_KEY_HEADER, create_cors_layer, create_trace_layer};
pub use routes::{AppState, create_router};
