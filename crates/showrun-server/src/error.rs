use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use showrun_core::{ErrorCode, ShowError};

// ---------------------------------------------------------------------------
// AppError: unified error type for HTTP responses
// ---------------------------------------------------------------------------

/// Unified error type for HTTP responses.
#[derive(Debug)]
pub struct AppError(pub anyhow::Error);

impl AppError {
    /// Construct a 400 Bad Request error with the given message.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self(ShowError::InvalidInput(msg.into()).into())
    }

    /// Construct a 503 error for a store that did not answer in time.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self(ShowError::StoreUnavailable(msg.into()).into())
    }

    fn code(&self) -> Option<ErrorCode> {
        self.0.downcast_ref::<ShowError>().map(ShowError::code)
    }
}

fn status_for(code: Option<ErrorCode>) -> StatusCode {
    match code {
        Some(ErrorCode::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorCode::InvalidTransition) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorCode::Conflict) => StatusCode::CONFLICT,
        Some(ErrorCode::StoreUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
        Some(ErrorCode::BadRequest) => StatusCode::BAD_REQUEST,
        None => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = status_for(code);
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({
            "error": self.0.to_string(),
            "code": code.map_or("internal", ErrorCode::as_str),
        });
        (status, axum::Json(body)).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
