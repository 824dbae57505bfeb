// HTTP error mapping
use crate::application::assistant_service::AssistantError;
use crate::application::report_service::ReportError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error(transparent)]
    Report(#[from] ReportError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Assistant(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Report(ReportError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Report(ReportError::Backend(_)) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
