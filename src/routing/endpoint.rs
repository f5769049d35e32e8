//! Endpoint keys and descriptors.
//!
//! # Responsibilities
//! - Parse `"METHOD /path/:param"` keys into method + normalized path
//! - Hold one endpoint's schema, handler and server options
//!
//! # Design Decisions
//! - Malformed keys are configuration errors, never defaulted
//! - `:name` and `{name}` segments both normalize to `{name}`
//! - Descriptors are immutable and cheap to clone (everything behind `Arc`)

use axum::http::Method;
use futures_util::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use crate::codec::Schema;
use crate::error::RouteConfigError;
use crate::routing::handler::{HandlerResources, HandlerResult};

/// The closed set of verbs an endpoint may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    pub fn to_http(self) -> Method {
        match self {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Patch => Method::PATCH,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            _ => Err(()),
        }
    }
}

/// Result of [`parse_endpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEndpoint {
    pub method: HttpMethod,
    /// Path template in `{name}` form.
    pub path: String,
    /// Parameter names in template order.
    pub params: Vec<String>,
}

impl ParsedEndpoint {
    /// Canonical repository key, e.g. `GET /api/cases/{id}`.
    pub fn key(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Split an endpoint key into method and path template.
pub fn parse_endpoint(endpoint: &str) -> Result<ParsedEndpoint, RouteConfigError> {
    let malformed = |reason: &str| RouteConfigError::MalformedEndpoint {
        endpoint: endpoint.to_string(),
        reason: reason.to_string(),
    };

    let mut tokens = endpoint.split_whitespace();
    let (Some(method), Some(path), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(malformed("expected '<METHOD> <path>'"));
    };

    let method = method
        .parse::<HttpMethod>()
        .map_err(|_| RouteConfigError::UnsupportedMethod {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        })?;

    if !path.starts_with('/') {
        return Err(malformed("path must start with '/'"));
    }

    let mut normalized = String::with_capacity(path.len());
    let mut params: Vec<String> = Vec::new();

    for segment in path.split('/').skip(1) {
        normalized.push('/');
        let name = if let Some(name) = segment.strip_prefix(':') {
            Some(name)
        } else if segment.starts_with('{') && segment.ends_with('}') {
            Some(&segment[1..segment.len() - 1])
        } else {
            None
        };

        match name {
            Some(name) => {
                if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                    return Err(malformed("path parameter names must be alphanumeric"));
                }
                if params.iter().any(|p| p == name) {
                    return Err(RouteConfigError::DuplicatePathParam {
                        endpoint: endpoint.to_string(),
                        param: name.to_string(),
                    });
                }
                params.push(name.to_string());
                normalized.push('{');
                normalized.push_str(name);
                normalized.push('}');
            }
            None => {
                if segment.contains(['{', '}', ':']) {
                    return Err(malformed("path parameters must span a whole segment"));
                }
                normalized.push_str(segment);
            }
        }
    }

    Ok(ParsedEndpoint {
        method,
        path: normalized,
        params,
    })
}

/// Free-form options handed through to the HTTP server layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Tags such as `access:admin`; the server adapter may act on them.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Per-route request body limit; falls back to the server default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_body_bytes: Option<usize>,

    /// Anything else the server adapter understands.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RouteOptions {
    pub fn tagged<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

type BoxedHandler<D> = Arc<dyn Fn(HandlerResources<D>) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// One HTTP operation: where it lives, what it accepts, and who answers it.
pub struct EndpointDescriptor<D> {
    endpoint: String,
    method: HttpMethod,
    path: String,
    path_params: Vec<String>,
    params: Arc<Schema>,
    response: Option<Arc<Schema>>,
    options: RouteOptions,
    handler: BoxedHandler<D>,
}

impl<D> Clone for EndpointDescriptor<D> {
    fn clone(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            method: self.method,
            path: self.path.clone(),
            path_params: self.path_params.clone(),
            params: Arc::clone(&self.params),
            response: self.response.clone(),
            options: self.options.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<D> fmt::Debug for EndpointDescriptor<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("endpoint", &self.endpoint)
            .field("params", &self.params.to_string())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<D: Send + Sync + 'static> EndpointDescriptor<D> {
    /// Create a descriptor with no declared parameters. Until
    /// [`with_params`](Self::with_params) is called, any path/query/body
    /// input is rejected.
    pub fn new<F, Fut>(endpoint: &str, handler: F) -> Result<Self, RouteConfigError>
    where
        F: Fn(HandlerResources<D>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let parsed = parse_endpoint(endpoint)?;
        Ok(Self {
            endpoint: parsed.key(),
            method: parsed.method,
            path: parsed.path,
            path_params: parsed.params,
            params: Arc::new(Schema::empty()),
            response: None,
            options: RouteOptions::default(),
            handler: Arc::new(move |resources| handler(resources).boxed()),
        })
    }
}

impl<D> EndpointDescriptor<D> {
    /// Schema for the merged `{ path, query, body }` candidate.
    pub fn with_params(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.params = schema.into();
        self
    }

    /// Schema used to encode successful results before they are sent.
    pub fn with_response(mut self, schema: impl Into<Arc<Schema>>) -> Self {
        self.response = Some(schema.into());
        self
    }

    pub fn with_options(mut self, options: RouteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn path_params(&self) -> &[String] {
        &self.path_params
    }

    pub fn params(&self) -> &Schema {
        &self.params
    }

    pub fn response(&self) -> Option<&Schema> {
        self.response.as_deref()
    }

    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    pub(crate) fn call(&self, resources: HandlerResources<D>) -> BoxFuture<'static, HandlerResult> {
        (self.handler)(resources)
    }
}
