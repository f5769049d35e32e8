//! Inbound request extraction.
//!
//! # Responsibilities
//! - Carry what the server adapter extracted (path params, query, body)
//! - Resolve the request ID (set by the request-ID layer, generated otherwise)
//! - Merge path/query/body into one candidate value for decoding
//!
//! # Design Decisions
//! - Query values stay strings; repeated keys become arrays
//! - Empty members are omitted so an endpoint without params accepts a bare
//!   request while still rejecting anything it did not declare
//! - An empty body is "no body"; anything else must be JSON

use axum::body::Bytes;
use axum::http::{HeaderMap, Uri};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::codec::DecodeErrors;
use crate::routing::HttpMethod;

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Request as handed over by the server adapter.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: HttpMethod,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub path_params: BTreeMap<String, String>,
    pub body: Bytes,
}

impl RawRequest {
    pub fn new(method: HttpMethod, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            path_params: BTreeMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn request_id(&self) -> String {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string())
    }

    pub fn query_value(&self) -> Value {
        let mut out = Map::new();
        let query = self.uri.query().unwrap_or_default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Value::String(value.into_owned());
            match out.get_mut(key.as_ref()) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    out.insert(key.into_owned(), value);
                }
            }
        }
        Value::Object(out)
    }

    pub fn body_value(&self) -> Result<Value, DecodeErrors> {
        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&self.body)
            .map_err(|e| DecodeErrors::unparsable("JSON body", format!("unparsable body ({})", e)))
    }

    pub fn path_value(&self) -> Value {
        Value::Object(
            self.path_params
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    /// `{ path, query, body }` with empty members left out.
    pub fn candidate(&self) -> Result<Value, DecodeErrors> {
        let mut candidate = Map::new();
        for (member, value) in [
            ("path", self.path_value()),
            ("query", self.query_value()),
            ("body", self.body_value()?),
        ] {
            if !is_empty_member(&value) {
                candidate.insert(member.to_string(), value);
            }
        }
        Ok(Value::Object(candidate))
    }
}

fn is_empty_member(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
