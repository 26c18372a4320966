pub mod accounts;
pub mod comments;
pub mod posts;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use byline_core::{PageParams, ServiceError};

use crate::service::BlogService;

/// Shared application state.
pub type AppState = Arc<BlogService>;

/// Build the blog API router.
pub fn router(state: AppState) -> Router {
    Router::new().nest("/v1", api_routes()).with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(accounts::routes())
}

/// Standard API error response body.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: u16,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let (code, message) = match err {
            ServiceError::Validation(msg) => (400, msg),
            ServiceError::Unauthorized(msg) => (401, msg),
            ServiceError::PermissionDenied(msg) => (403, msg),
            ServiceError::NotFound(msg) => (404, msg),
            ServiceError::Conflict(msg) => (409, msg),
            ServiceError::Storage(msg) => (500, msg),
            ServiceError::Internal(msg) => (500, msg),
        };
        ApiError { code, message }
    }
}

/// Wrap a Result<T, ServiceError> into an API response.
pub(crate) fn ok_json<T: Serialize>(result: Result<T, ServiceError>) -> Result<Json<T>, ApiError> {
    result.map(Json).map_err(ApiError::from)
}

/// Like [`ok_json`], but respond 201 Created.
pub(crate) fn created_json<T: Serialize>(
    result: Result<T, ServiceError>,
) -> Result<(StatusCode, Json<T>), ApiError> {
    result
        .map(|value| (StatusCode::CREATED, Json(value)))
        .map_err(ApiError::from)
}

/// Assemble page parameters from optional query fields.
pub(crate) fn page_params(page: Option<usize>, limit: Option<usize>) -> PageParams {
    let defaults = PageParams::default();
    PageParams {
        page: page.unwrap_or(defaults.page),
        limit: limit.unwrap_or(defaults.limit),
    }
}
