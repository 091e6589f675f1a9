//! API module for handling HTTP requests and responses

#[cfg(feature = "web")]
pub(crate) mod handlers;
#[cfg(feature = "web")]
pub(crate) mod responses;

#[cfg(feature = "web")]
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
#[cfg(feature = "web")]
use http::HeaderName;
#[cfg(feature = "web")]
use std::sync::Arc;
#[cfg(feature = "web")]
use tower::ServiceBuilder;
#[cfg(feature = "web")]
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
#[cfg(feature = "web")]
use crate::state::AppState;

#[cfg(feature = "web")]
pub use handlers::{compare_images, read_root};

#[cfg(feature = "web")]
const REQUEST_ID_HEADER: &str = "x-request-id";

#[cfg(feature = "web")]
/// Create the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let body_limit = state.config.max_body_bytes();

    Router::new()
        // Liveness
        .route("/", get(read_root))
        // Image comparison
        .route("/compare", post(compare_images))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(request_id)),
        )
        .layer(cors)
        .with_state(state)
}
