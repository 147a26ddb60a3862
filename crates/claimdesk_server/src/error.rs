//! HTTP mapping of `AdminError`: the `http_status()` code with a
//! `{status: "error", message}` body.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use claimdesk_core::{ActionOutcome, AdminError};

#[derive(Debug)]
pub struct AppError(pub AdminError);

impl From<AdminError> for AppError {
    fn from(e: AdminError) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AdminError::Invalid(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "admin action failed");
        }
        (status, Json(ActionOutcome::error(self.0.user_message()))).into_response()
    }
}
