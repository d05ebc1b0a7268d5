use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    make_span_with_request_id, method_not_allowed_middleware, request_id_middleware,
};

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/recommend", post(handlers::recommend))
        .route("/events", post(handlers::add_events))
        .fallback(handlers::not_found)
        .layer(
            ServiceBuilder::new()
                // request id is assigned before the trace span is opened
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(middleware::from_fn(method_not_allowed_middleware)),
        )
        .with_state(state)
}
