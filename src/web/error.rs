use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("Upstream returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("Malformed upstream response: {0}")]
    MalformedResponse(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Configuration error: {msg}"),
            ),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::UpstreamUnavailable(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Upstream unavailable: {msg}"),
            ),
            AppError::UpstreamStatus { status, body } => (
                StatusCode::BAD_GATEWAY,
                format!("Upstream returned status {status}: {body}"),
            ),
            AppError::MalformedResponse(msg) => (
                StatusCode::BAD_GATEWAY,
                format!("Malformed upstream response: {msg}"),
            ),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::MalformedResponse(err.to_string())
        } else {
            // Connect failures, timeouts and other transport-level errors.
            AppError::UpstreamUnavailable(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (
                AppError::Config("missing AWS_REGION".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::InvalidInput("bad body".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::UpstreamUnavailable("connection refused".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::UpstreamStatus {
                    status: 403,
                    body: "forbidden".to_string(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::MalformedResponse("not json".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
