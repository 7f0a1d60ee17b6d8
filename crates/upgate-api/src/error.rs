//! HTTP error response conversion
//!
//! **Handler pattern:** return `Result<Response, HttpAppError>`. Expected upload
//! outcomes (rejections) are rendered with [`RejectionResponse`]; only internal
//! failures travel as `HttpAppError` and always render as a generic 500.

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use upgate_core::{AppError, ErrorMetadata, LogLevel, RejectionReason};
use upgate_infra::ErrorResponse;

/// Returned when the multipart body carries no `file` field.
pub const NO_FILE_CODE: &str = "NO_FILE";

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from upgate-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(AppError::from(err))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let details = error.detailed_message();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %details, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %details, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %details, error_type = error_type, "Error occurred");
        }
    }
}

fn status_of<E: ErrorMetadata>(err: &E) -> StatusCode {
    StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        log_error(app_error);

        (status_of(app_error), Json(ErrorResponse::from_metadata(app_error))).into_response()
    }
}

/// A pipeline rejection rendered for the client.
#[derive(Debug, Clone, Copy)]
pub struct RejectionResponse {
    pub reason: RejectionReason,
    /// Sent as `Retry-After` (whole seconds, at least 1) when set.
    pub retry_after: Option<Duration>,
}

impl RejectionResponse {
    pub fn new(reason: RejectionReason) -> Self {
        Self {
            reason,
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

impl IntoResponse for RejectionResponse {
    fn into_response(self) -> Response {
        let mut response = (
            status_of(&self.reason),
            Json(ErrorResponse::from_metadata(&self.reason)),
        )
            .into_response();

        if let Some(retry_after) = self.retry_after {
            let seconds = retry_after.as_secs().max(1);
            if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }

        response
    }
}

/// 400 for a request that did not carry an upload at all.
pub fn no_file_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: "No file uploaded".to_string(),
            code: NO_FILE_CODE.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_error_is_500() {
        let response = HttpAppError(AppError::Storage("disk full".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rejection_status_mapping() {
        let cases = [
            (RejectionReason::FileTooLarge, StatusCode::PAYLOAD_TOO_LARGE),
            (RejectionReason::InvalidFilename, StatusCode::BAD_REQUEST),
            (RejectionReason::InvalidExtension, StatusCode::BAD_REQUEST),
            (RejectionReason::InvalidType, StatusCode::BAD_REQUEST),
            (RejectionReason::ContainsMalware, StatusCode::BAD_REQUEST),
            (
                RejectionReason::SecurityCheckFailed,
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                RejectionReason::RateLimitExceeded,
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (RejectionReason::Incomplete, StatusCode::BAD_REQUEST),
        ];
        for (reason, status) in cases {
            assert_eq!(
                RejectionResponse::new(reason).into_response().status(),
                status,
                "{:?}",
                reason
            );
        }
    }

    #[test]
    fn test_retry_after_rounds_up_to_one_second() {
        let response = RejectionResponse::new(RejectionReason::RateLimitExceeded)
            .with_retry_after(Duration::from_millis(200))
            .into_response();
        assert_eq!(response.headers()[header::RETRY_AFTER], "1");
    }

    #[test]
    fn test_no_retry_after_by_default() {
        let response = RejectionResponse::new(RejectionReason::InvalidType).into_response();
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}
