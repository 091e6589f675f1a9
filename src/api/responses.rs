use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::{HeaderName, HeaderValue};
use serde::Serialize;

use crate::models::comparison::Comparison;

/// Header reporting whether the result came from the cache
pub const CACHE_HEADER: &str = "x-cache";

/// Static status payload
#[derive(Serialize)]
pub struct StatusMessage {
    pub message: &'static str,
}

impl StatusMessage {
    pub fn running() -> Self {
        Self {
            message: "Image Comparison API is running",
        }
    }
}

/// Successful comparison: the result as JSON plus the `X-Cache` header.
pub struct CompareResponse(pub Comparison);

impl IntoResponse for CompareResponse {
    fn into_response(self) -> Response {
        let Comparison { result, cache } = self.0;
        let mut response = Json(result).into_response();
        response.headers_mut().insert(
            HeaderName::from_static(CACHE_HEADER),
            HeaderValue::from_static(cache.as_header_value()),
        );
        response
    }
}
