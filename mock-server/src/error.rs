//! Error responses in the backend's JSON shapes: auth failures carry
//! `detail`, everything else carries `error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    /// The update endpoint answers 405 when a field is missing.
    MissingFields,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, Json(json!({ "detail": msg }))),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))),
            AppError::MissingFields => (
                StatusCode::METHOD_NOT_ALLOWED,
                Json(json!({ "error": "All fields are required." })),
            ),
        }
        .into_response()
    }
}
