//! Per-request state machine.
//!
//! ```text
//! RECEIVED → DECODING ─┬─ DECODE_FAILED ───────────────────────┐
//!                      └─ DECODED → HANDLING ─┬─ HANDLER_ERROR ─┼→ RESPONDED
//!                                             └─ HANDLER_OK ────┘
//! ```
//!
//! Every path ends in exactly one [`RouteResponse`]. A handler that outlives
//! the request timeout is answered with 408 from here, so the transport only
//! drops the future when the client is gone; the [`InFlight`] guard then
//! records the 499 instead.

use futures_util::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::codec::{decode, encode};
use crate::error::{RouteError, CLIENT_CLOSED_REQUEST};
use crate::http::abort::InFlight;
use crate::http::request::RawRequest;
use crate::http::response::{ResponseFactory, RouteResponse};
use crate::observability::metrics;
use crate::routing::{
    DecodedParams, EndpointDescriptor, HandlerResources, Reply, RequestContext, RequestInfo,
    RouteLogger,
};

/// Message sent for requests the client abandoned.
pub const CLIENT_CLOSED_MESSAGE: &str = "Client closed request";

/// Message sent when a handler runs past the request timeout.
pub const TIMED_OUT_MESSAGE: &str = "Request timed out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Decoding,
    DecodeFailed,
    Decoded,
    Handling,
    HandlerError,
    HandlerOk,
    Responded,
}

/// Which classification rule matched a handler error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Domain,
    Upstream,
    Aborted,
    Unexpected,
}

/// Outcome of [`classify_error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub class: ErrorClass,
    pub status_code: u16,
    pub message: String,
}

/// Map a handler error to a status and message. First match wins:
/// domain error, upstream envelope, abort, anything else.
pub fn classify_error(error: &RouteError) -> Classification {
    match error {
        RouteError::Domain(domain) => Classification {
            class: ErrorClass::Domain,
            status_code: domain.kind.status_code().as_u16(),
            message: domain.message.clone(),
        },
        RouteError::Upstream(upstream) if !upstream.is_request_aborted() => Classification {
            class: ErrorClass::Upstream,
            status_code: upstream.status_code,
            message: upstream.message.clone(),
        },
        RouteError::Upstream(_) | RouteError::Aborted => Classification {
            class: ErrorClass::Aborted,
            status_code: CLIENT_CLOSED_REQUEST,
            message: CLIENT_CLOSED_MESSAGE.to_string(),
        },
        RouteError::Unexpected(inner) => Classification {
            class: ErrorClass::Unexpected,
            status_code: 500,
            message: inner.to_string(),
        },
    }
}

/// Tracks the state of one request and logs transitions at trace level.
struct RequestFlow {
    endpoint: Arc<str>,
    request_id: Arc<str>,
    state: RequestState,
}

impl RequestFlow {
    fn new(endpoint: Arc<str>, request_id: Arc<str>) -> Self {
        Self {
            endpoint,
            request_id,
            state: RequestState::Received,
        }
    }

    fn advance(&mut self, next: RequestState) {
        tracing::trace!(
            endpoint = %self.endpoint,
            request_id = %self.request_id,
            from = ?self.state,
            to = ?next,
            "Request state transition"
        );
        self.state = next;
    }
}

/// Run one request through decode → handle → respond.
///
/// With a `timeout`, a handler still running when it elapses is dropped and
/// the request is answered with 408.
pub async fn dispatch<D>(
    descriptor: EndpointDescriptor<D>,
    dependencies: Arc<D>,
    raw: RawRequest,
    timeout: Option<Duration>,
) -> RouteResponse
where
    D: Send + Sync + 'static,
{
    let endpoint: Arc<str> = Arc::from(descriptor.endpoint());
    let request_id: Arc<str> = Arc::from(raw.request_id());
    let (mut in_flight, abort) = InFlight::new(Arc::clone(&endpoint), Arc::clone(&request_id));
    let mut flow = RequestFlow::new(Arc::clone(&endpoint), Arc::clone(&request_id));

    flow.advance(RequestState::Decoding);
    let decoded = raw
        .candidate()
        .and_then(|candidate| decode(descriptor.params(), &candidate));

    let params = match decoded {
        Ok(params) => params,
        Err(errors) => {
            flow.advance(RequestState::DecodeFailed);
            tracing::warn!(
                endpoint = %endpoint,
                request_id = %request_id,
                issues = errors.len(),
                "Request failed validation"
            );
            metrics::record_decode_failure(&endpoint);
            let response = ResponseFactory::custom_error(400, errors.to_string());
            return finish(flow, &mut in_flight, response);
        }
    };
    flow.advance(RequestState::Decoded);

    let resources = HandlerResources {
        context: RequestContext {
            request_id: Arc::clone(&request_id),
            endpoint: Arc::clone(&endpoint),
            abort,
        },
        request: RequestInfo {
            method: raw.method,
            uri: raw.uri,
            headers: raw.headers,
        },
        logger: RouteLogger::new(Arc::clone(&endpoint), Arc::clone(&request_id)),
        params: DecodedParams::new(params),
        dependencies,
    };

    flow.advance(RequestState::Handling);
    let handling = AssertUnwindSafe(descriptor.call(resources)).catch_unwind();
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handling).await {
            Ok(outcome) => outcome,
            Err(_) => {
                flow.advance(RequestState::HandlerError);
                tracing::warn!(
                    endpoint = %endpoint,
                    request_id = %request_id,
                    timeout_ms = limit.as_millis() as u64,
                    "Route handler timed out"
                );
                let response = ResponseFactory::custom_error(408, TIMED_OUT_MESSAGE);
                return finish(flow, &mut in_flight, response);
            }
        },
        None => handling.await,
    };

    let response = match outcome {
        Ok(Ok(reply)) => {
            flow.advance(RequestState::HandlerOk);
            match reply {
                Reply::NoContent => ResponseFactory::no_content(),
                Reply::Json(body) => ResponseFactory::ok(encode_result(&descriptor, body)),
            }
        }
        Ok(Err(error)) => {
            flow.advance(RequestState::HandlerError);
            respond_to_error(&endpoint, &request_id, &error)
        }
        Err(panic) => {
            flow.advance(RequestState::HandlerError);
            let message = panic_message(panic.as_ref());
            tracing::error!(
                endpoint = %endpoint,
                request_id = %request_id,
                panic = %message,
                "Handler panicked"
            );
            ResponseFactory::custom_error(500, message)
        }
    };

    finish(flow, &mut in_flight, response)
}

fn finish(mut flow: RequestFlow, in_flight: &mut InFlight, response: RouteResponse) -> RouteResponse {
    in_flight.responded();
    metrics::record_request(&flow.endpoint, response.status().as_u16(), in_flight.started());
    flow.advance(RequestState::Responded);
    response
}

fn encode_result<D>(descriptor: &EndpointDescriptor<D>, body: Value) -> Value {
    match descriptor.response() {
        Some(schema) => encode(schema, &body),
        None => body,
    }
}

fn respond_to_error(endpoint: &str, request_id: &str, error: &RouteError) -> RouteResponse {
    let classification = classify_error(error);
    match classification.class {
        ErrorClass::Domain | ErrorClass::Upstream => {
            tracing::error!(
                endpoint = %endpoint,
                request_id = %request_id,
                status = classification.status_code,
                "{}",
                classification.message
            );
        }
        ErrorClass::Aborted => {
            tracing::debug!(
                endpoint = %endpoint,
                request_id = %request_id,
                status = classification.status_code,
                "Client closed request"
            );
        }
        ErrorClass::Unexpected => {
            tracing::error!(
                endpoint = %endpoint,
                request_id = %request_id,
                status = classification.status_code,
                error = ?error,
                "Unhandled error in route handler"
            );
        }
    }
    ResponseFactory::custom_error(classification.status_code, classification.message)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Route handler panicked".to_string()
    }
}
