//! API error handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use murmur_core::FailureKind;
use serde_json::json;

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.into(),
        }
    }

    fn with_status(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "code": self.status.as_u16()
            }
        }));
        (self.status, body).into_response()
    }
}

impl From<murmur_core::Error> for ApiError {
    fn from(err: murmur_core::Error) -> Self {
        let message = err.to_string();
        match err.kind() {
            FailureKind::MissingCredential => Self::with_status(StatusCode::UNAUTHORIZED, message),
            FailureKind::Upstream => Self::with_status(StatusCode::BAD_GATEWAY, message),
            FailureKind::Network => Self::with_status(StatusCode::SERVICE_UNAVAILABLE, message),
            _ => match err {
                murmur_core::Error::InvalidInput(_) => ApiError::bad_request(message),
                _ => ApiError::internal(message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::Error;

    #[test]
    fn test_status_follows_failure_kind() {
        let cases = [
            (Error::Auth("no key".into()), StatusCode::UNAUTHORIZED),
            (
                Error::Upstream {
                    status: 500,
                    body: "boom".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (Error::Network("reset".into()), StatusCode::SERVICE_UNAVAILABLE),
            (Error::InvalidInput("empty".into()), StatusCode::BAD_REQUEST),
            (Error::CacheIo("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }
}
