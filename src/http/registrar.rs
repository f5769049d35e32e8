//! Route registration against an HTTP server.
//!
//! # Responsibilities
//! - Abstract the server behind [`HttpServerSetup`] / [`RouteRegistrar`]
//! - Turn every descriptor of a [`RouteRepository`] into one registered route
//! - Provide the axum adapter used in production
//!
//! # Design Decisions
//! - Registration happens once at startup; the resulting router is immutable
//! - The adapter only extracts raw inputs; decoding and classification live
//!   in `dispatch`, so every server adapter behaves the same

use axum::{
    extract::{FromRequestParts, Path, Request},
    middleware,
    response::{IntoResponse, Response},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use futures_util::future::{BoxFuture, FutureExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::http::dispatch::dispatch;
use crate::http::middleware::{admin_auth_middleware, ADMIN_TAG};
use crate::http::request::RawRequest;
use crate::http::response::{ResponseFactory, RouteResponse};
use crate::routing::{HttpMethod, RouteOptions, RouteRepository};

/// Default request body limit when neither config nor route sets one.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Where a route lives and how it is configured.
#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub path: String,
    pub options: RouteOptions,
}

/// Server-facing handler: raw request in, exactly one response out.
pub type RawHandler = Arc<dyn Fn(RawRequest) -> BoxFuture<'static, RouteResponse> + Send + Sync>;

/// A router that routes can be registered on.
pub trait RouteRegistrar {
    fn route(&mut self, method: HttpMethod, spec: RouteSpec, handler: RawHandler);

    fn get(&mut self, spec: RouteSpec, handler: RawHandler) {
        self.route(HttpMethod::Get, spec, handler);
    }

    fn post(&mut self, spec: RouteSpec, handler: RawHandler) {
        self.route(HttpMethod::Post, spec, handler);
    }

    fn put(&mut self, spec: RouteSpec, handler: RawHandler) {
        self.route(HttpMethod::Put, spec, handler);
    }

    fn delete(&mut self, spec: RouteSpec, handler: RawHandler) {
        self.route(HttpMethod::Delete, spec, handler);
    }

    fn patch(&mut self, spec: RouteSpec, handler: RawHandler) {
        self.route(HttpMethod::Patch, spec, handler);
    }
}

/// Handle on an HTTP server able to hand out a router.
pub trait HttpServerSetup {
    type Router: RouteRegistrar;

    fn create_router(&self) -> Self::Router;

    /// How long a handler may run before the request is answered with 408.
    fn request_timeout(&self) -> Option<Duration> {
        None
    }
}

/// Register every endpoint of `repository` on a fresh router.
pub fn register_routes<S, D>(
    server: &S,
    repository: &RouteRepository<D>,
    dependencies: Arc<D>,
) -> S::Router
where
    S: HttpServerSetup,
    D: Send + Sync + 'static,
{
    let mut router = server.create_router();
    let timeout = server.request_timeout();

    for descriptor in repository.iter() {
        let method = descriptor.method();
        let spec = RouteSpec {
            path: descriptor.path().to_string(),
            options: descriptor.options().clone(),
        };
        let descriptor = descriptor.clone();
        let dependencies = Arc::clone(&dependencies);
        let endpoint = descriptor.endpoint().to_string();

        let handler: RawHandler = Arc::new(move |raw| {
            dispatch(descriptor.clone(), Arc::clone(&dependencies), raw, timeout).boxed()
        });

        router.route(method, spec, handler);
        tracing::debug!(endpoint = %endpoint, "Registered route");
    }

    tracing::info!(routes = repository.len(), "Routes registered");
    router
}

/// axum-backed server handle.
#[derive(Debug, Clone)]
pub struct AxumServerSetup {
    admin_api_key: Option<Arc<str>>,
    default_body_limit: usize,
    request_timeout: Option<Duration>,
}

impl Default for AxumServerSetup {
    fn default() -> Self {
        Self {
            admin_api_key: None,
            default_body_limit: DEFAULT_BODY_LIMIT,
            request_timeout: None,
        }
    }
}

impl AxumServerSetup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `Authorization: Bearer <key>` on routes tagged `access:admin`.
    pub fn with_admin_api_key(mut self, api_key: impl Into<Arc<str>>) -> Self {
        self.admin_api_key = Some(api_key.into());
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.default_body_limit = bytes;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl HttpServerSetup for AxumServerSetup {
    type Router = AxumRouter;

    fn create_router(&self) -> AxumRouter {
        AxumRouter {
            router: Router::new(),
            admin_api_key: self.admin_api_key.clone(),
            default_body_limit: self.default_body_limit,
        }
    }

    fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }
}

/// Router under construction.
pub struct AxumRouter {
    router: Router,
    admin_api_key: Option<Arc<str>>,
    default_body_limit: usize,
}

impl AxumRouter {
    pub fn into_router(self) -> Router {
        self.router
    }
}

impl RouteRegistrar for AxumRouter {
    fn route(&mut self, method: HttpMethod, spec: RouteSpec, handler: RawHandler) {
        let body_limit = spec.options.max_body_bytes.unwrap_or(self.default_body_limit);
        let has_params = spec.path.contains('{');

        let mut method_router: MethodRouter = on(method_filter(method), move |request: Request| {
            let handler = Arc::clone(&handler);
            async move { serve(handler, method, has_params, body_limit, request).await }
        });

        if spec.options.has_tag(ADMIN_TAG) {
            if let Some(api_key) = &self.admin_api_key {
                method_router = method_router.layer(middleware::from_fn_with_state(
                    Arc::clone(api_key),
                    admin_auth_middleware,
                ));
            }
        }

        let router = std::mem::take(&mut self.router);
        self.router = router.route(&spec.path, method_router);
    }
}

fn method_filter(method: HttpMethod) -> MethodFilter {
    match method {
        HttpMethod::Get => MethodFilter::GET,
        HttpMethod::Post => MethodFilter::POST,
        HttpMethod::Put => MethodFilter::PUT,
        HttpMethod::Delete => MethodFilter::DELETE,
        HttpMethod::Patch => MethodFilter::PATCH,
    }
}

async fn serve(
    handler: RawHandler,
    method: HttpMethod,
    has_params: bool,
    body_limit: usize,
    request: Request,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let path_params = if has_params {
        match Path::<BTreeMap<String, String>>::from_request_parts(&mut parts, &()).await {
            Ok(Path(params)) => params,
            Err(rejection) => {
                return ResponseFactory::custom_error(400, rejection.body_text()).into_response();
            }
        }
    } else {
        BTreeMap::new()
    };

    let body = match axum::body::to_bytes(body, body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %parts.uri.path(), error = %e, "Failed to read request body");
            return ResponseFactory::custom_error(413, "Request body too large").into_response();
        }
    };

    let raw = RawRequest {
        method,
        uri: parts.uri,
        headers: parts.headers,
        path_params,
        body,
    };
    handler(raw).await.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{EndpointDescriptor, Reply};
    use std::sync::Mutex;

    /// Records registrations instead of serving them.
    struct RecordingRouter {
        routes: Arc<Mutex<Vec<(HttpMethod, String, Vec<String>)>>>,
    }

    impl RouteRegistrar for RecordingRouter {
        fn route(&mut self, method: HttpMethod, spec: RouteSpec, _handler: RawHandler) {
            self.routes
                .lock()
                .unwrap()
                .push((method, spec.path, spec.options.tags));
        }
    }

    struct RecordingServer {
        routes: Arc<Mutex<Vec<(HttpMethod, String, Vec<String>)>>>,
    }

    impl HttpServerSetup for RecordingServer {
        type Router = RecordingRouter;

        fn create_router(&self) -> RecordingRouter {
            RecordingRouter {
                routes: Arc::clone(&self.routes),
            }
        }
    }

    #[test]
    fn test_register_routes_registers_every_descriptor() {
        let repository = RouteRepository::new()
            .add(EndpointDescriptor::new("GET /a/:id", |_| async { Ok(Reply::NoContent) }).unwrap())
            .unwrap()
            .add(
                EndpointDescriptor::new("POST /b", |_| async { Ok(Reply::NoContent) })
                    .unwrap()
                    .with_options(RouteOptions::tagged(["access:admin"])),
            )
            .unwrap();

        let server = RecordingServer {
            routes: Arc::default(),
        };
        register_routes(&server, &repository, Arc::new(()));

        let routes = server.routes.lock().unwrap().clone();
        assert_eq!(
            routes,
            vec![
                (HttpMethod::Get, "/a/{id}".to_string(), vec![]),
                (HttpMethod::Post, "/b".to_string(), vec!["access:admin".to_string()]),
            ]
        );
    }

    #[test]
    fn test_verb_helpers_forward_method() {
        let server = RecordingServer {
            routes: Arc::default(),
        };
        let mut router = server.create_router();
        let handler: RawHandler = Arc::new(|_| async { ResponseFactory::no_content() }.boxed());
        let spec = RouteSpec {
            path: "/x".into(),
            options: RouteOptions::default(),
        };
        router.delete(spec.clone(), Arc::clone(&handler));
        router.patch(spec, handler);

        let methods: Vec<_> = server.routes.lock().unwrap().iter().map(|r| r.0).collect();
        assert_eq!(methods, vec![HttpMethod::Delete, HttpMethod::Patch]);
    }
}
