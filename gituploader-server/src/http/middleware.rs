//! HTTP middleware configuration.

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, Method},
    middleware::Next,
    response::Response,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::debug;

use super::routes::AppState;

/// Header carrying the optional client API key.
pub const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-api-key");

/// Create the CORS layer: any origin, the methods and headers browser clients send.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::AUTHORIZATION,
            API_KEY_HEADER,
        ])
        .allow_origin(Any)
}

/// Create the trace layer for request logging.
pub fn create_trace_layer() -> TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
}

/// Compare `x-api-key` with the configured key.
///
/// Not enforced: the request proceeds whatever the outcome.
pub async fn check_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(expected) = state.config.api_key.as_deref() {
        let given = request
            .headers()
            .get(&API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        match given {
            Some(key) if key == expected => debug!("API key accepted"),
            Some(_) => debug!("API key mismatch (not enforced)"),
            None => debug!("API key missing (not enforced)"),
        }
    }

    next.run(request).await
}
