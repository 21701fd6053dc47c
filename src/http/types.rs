use axum::response::{IntoResponse, Response};
use axum::http::StatusCode;
use serde_json::json;

use crate::error::SyncError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self { Self { status: StatusCode::BAD_REQUEST, message: message.into() } }
}

impl From<SyncError> for ApiError {
    fn from(e: SyncError) -> Self {
        let status = if e.is_transport() { StatusCode::BAD_GATEWAY } else { StatusCode::INTERNAL_SERVER_ERROR };
        Self { status, message: e.to_string() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response { (self.status, axum::Json(json!({ "message": self.message }))).into_response() }
}
