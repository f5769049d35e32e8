//! What handlers receive and what they return.

use axum::http::{HeaderMap, Uri};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::error::{DomainError, RouteError};
use crate::http::abort::AbortSignal;
use crate::routing::endpoint::HttpMethod;

/// Result type every handler produces.
pub type HandlerResult = Result<Reply, RouteError>;

/// Successful handler outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Serialized as the 200 response body.
    Json(Value),
    /// Empty 204 response.
    NoContent,
}

impl Reply {
    pub fn ok<T: Serialize>(body: &T) -> HandlerResult {
        Ok(Reply::Json(serde_json::to_value(body)?))
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::NoContent
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

/// Per-request identity and cancellation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Arc<str>,
    pub endpoint: Arc<str>,
    /// Trips when the caller disconnects before a response is written.
    pub abort: AbortSignal,
}

/// Read-only view of the inbound request.
#[derive(Debug, Clone)]
pub struct RequestInfo {
    pub method: HttpMethod,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// The decoded `{ path, query, body }` value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedParams(Value);

impl DecodedParams {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    pub fn path(&self, name: &str) -> Option<&Value> {
        self.0.get("path").and_then(|p| p.get(name))
    }

    pub fn query(&self, name: &str) -> Option<&Value> {
        self.0.get("query").and_then(|q| q.get(name))
    }

    pub fn body(&self) -> Option<&Value> {
        self.0.get("body")
    }

    /// A path parameter the schema declared as a string.
    pub fn path_str(&self, name: &str) -> Result<&str, RouteError> {
        self.path(name)
            .and_then(Value::as_str)
            .ok_or_else(|| DomainError::bad_input(format!("Missing path parameter '{}'", name)).into())
    }

    /// Deserialize the whole decoded value into a typed struct.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T, RouteError> {
        serde_json::from_value(self.0)
            .map_err(|e| DomainError::bad_input(format!("Invalid request parameters: {}", e)).into())
    }

    /// Deserialize one member (`path`, `query` or `body`).
    pub fn member<T: DeserializeOwned>(&self, member: &str) -> Result<Option<T>, RouteError> {
        match self.0.get(member) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| DomainError::bad_input(format!("Invalid {}: {}", member, e)).into()),
            None => Ok(None),
        }
    }
}

/// Logger bound to one endpoint and request. The tracing subscriber decides
/// where records go.
#[derive(Debug, Clone)]
pub struct RouteLogger {
    endpoint: Arc<str>,
    request_id: Arc<str>,
}

impl RouteLogger {
    pub fn new(endpoint: Arc<str>, request_id: Arc<str>) -> Self {
        Self {
            endpoint,
            request_id,
        }
    }

    pub fn error(&self, message: impl fmt::Display) {
        tracing::error!(endpoint = %self.endpoint, request_id = %self.request_id, "{}", message);
    }

    pub fn warn(&self, message: impl fmt::Display) {
        tracing::warn!(endpoint = %self.endpoint, request_id = %self.request_id, "{}", message);
    }

    pub fn info(&self, message: impl fmt::Display) {
        tracing::info!(endpoint = %self.endpoint, request_id = %self.request_id, "{}", message);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        tracing::debug!(endpoint = %self.endpoint, request_id = %self.request_id, "{}", message);
    }
}

/// Everything a handler is called with.
pub struct HandlerResources<D> {
    pub context: RequestContext,
    pub request: RequestInfo,
    pub logger: RouteLogger,
    pub params: DecodedParams,
    pub dependencies: Arc<D>,
}
