use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::{
    error::{AppError, Result},
    models::comparison::ComparisonRequest,
    AppState,
};

use super::responses::{CompareResponse, StatusMessage};

/// `GET /`
pub async fn read_root() -> impl IntoResponse {
    Json(StatusMessage::running())
}

/// `POST /compare`
///
/// Bodies that are not a valid comparison request are a validation error.
/// Other rejections, such as a body over the size limit, keep axum's status.
pub async fn compare_images(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ComparisonRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(
            rejection @ (JsonRejection::JsonDataError(_)
            | JsonRejection::JsonSyntaxError(_)
            | JsonRejection::MissingJsonContentType(_)),
        ) => return Err(AppError::Validation(rejection.body_text())),
        Err(rejection) => {
            log::warn!("Rejected comparison request: {}", rejection.body_text());
            return Ok(rejection.into_response());
        }
    };

    let comparison = state
        .comparator
        .compare(&request.image1, &request.image2)
        .await?;

    Ok(CompareResponse(comparison).into_response())
}
