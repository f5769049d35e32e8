//! Response building.
//!
//! # Responsibilities
//! - Provide the response helpers handlers' outcomes map onto
//!   (`ok`, `no_content`, `custom_error`)
//! - Render every error as a JSON `{ "message": ... }` body
//!
//! # Design Decisions
//! - Status 499 has no canonical reason phrase; it is built from its code
//! - Debug detail and stack traces never reach the body

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// The one response a request ends with.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteResponse {
    Ok(Value),
    NoContent,
    CustomError { status: StatusCode, body: ErrorBody },
}

impl RouteResponse {
    pub fn status(&self) -> StatusCode {
        match self {
            RouteResponse::Ok(_) => StatusCode::OK,
            RouteResponse::NoContent => StatusCode::NO_CONTENT,
            RouteResponse::CustomError { status, .. } => *status,
        }
    }
}

/// Response helpers.
pub struct ResponseFactory;

impl ResponseFactory {
    pub fn ok(body: Value) -> RouteResponse {
        RouteResponse::Ok(body)
    }

    pub fn no_content() -> RouteResponse {
        RouteResponse::NoContent
    }

    /// Error response with an arbitrary status code. Codes outside the valid
    /// HTTP range collapse to 500.
    pub fn custom_error(status_code: u16, message: impl Into<String>) -> RouteResponse {
        let status = StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        RouteResponse::CustomError {
            status,
            body: ErrorBody {
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for RouteResponse {
    fn into_response(self) -> Response {
        match self {
            RouteResponse::Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            RouteResponse::NoContent => StatusCode::NO_CONTENT.into_response(),
            RouteResponse::CustomError { status, body } => (status, Json(body)).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_error_accepts_non_standard_codes() {
        let response = ResponseFactory::custom_error(499, "Client closed request");
        assert_eq!(response.status().as_u16(), 499);
    }

    #[test]
    fn test_invalid_status_collapses_to_500() {
        let response = ResponseFactory::custom_error(42, "weird");
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_status() {
        assert_eq!(ResponseFactory::no_content().into_response().status(), StatusCode::NO_CONTENT);
        assert_eq!(
            ResponseFactory::ok(serde_json::json!({"a": 1})).into_response().status(),
            StatusCode::OK
        );
    }
}
