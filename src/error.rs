//! Error taxonomy shared by handlers and the registrar.
//!
//! # Design Decisions
//! - Handlers return [`RouteError`]; the registrar classifies it into exactly
//!   one HTTP status (see `http::dispatch::classify_error`)
//! - Decode failures never reach handlers and are not part of this enum
//! - Configuration mistakes surface at startup as [`RouteConfigError`]

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Business-domain error categories with a fixed HTTP mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    BadInput,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            ErrorKind::BadInput => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A business-rule violation raised by handler code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DomainError {
    pub kind: ErrorKind,
    pub message: String,
}

impl DomainError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn bad_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

/// Status code used for requests the client abandoned.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Failure reported by a downstream service or client library that already
/// knows which HTTP status it maps to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub status_code: u16,
    pub message: String,
    /// Set when the downstream call was cancelled because the caller went away.
    pub request_aborted: bool,
}

impl UpstreamError {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            request_aborted: false,
        }
    }

    /// The downstream request was aborted before it completed.
    pub fn request_aborted(message: impl Into<String>) -> Self {
        Self {
            status_code: CLIENT_CLOSED_REQUEST,
            message: message.into(),
            request_aborted: true,
        }
    }

    pub fn is_request_aborted(&self) -> bool {
        self.request_aborted || self.status_code == CLIENT_CLOSED_REQUEST
    }
}

/// Everything a handler may fail with.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The inbound connection was closed before the handler finished.
    #[error("Client closed request")]
    Aborted,

    /// Programmer error or an unrecognized failure.
    #[error("{0}")]
    Unexpected(Box<dyn std::error::Error + Send + Sync>),
}

impl RouteError {
    pub fn unexpected<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        RouteError::Unexpected(error.into())
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(error: serde_json::Error) -> Self {
        RouteError::unexpected(error)
    }
}

/// Startup-time route configuration errors. Always fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteConfigError {
    #[error("Malformed endpoint '{endpoint}': {reason}")]
    MalformedEndpoint { endpoint: String, reason: String },

    #[error("Unsupported HTTP method '{method}' in endpoint '{endpoint}'")]
    UnsupportedMethod { endpoint: String, method: String },

    #[error("Duplicate path parameter '{param}' in endpoint '{endpoint}'")]
    DuplicatePathParam { endpoint: String, param: String },

    #[error("Duplicate endpoint '{0}'")]
    DuplicateEndpoint(String),
}
