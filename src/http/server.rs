//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the registered routes with the shared middleware stack
//!   (request ID, tracing)
//! - Bind the router to a listener
//! - Drain in-flight requests on shutdown

use axum::{http::HeaderName, Router};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::http::request::X_REQUEST_ID;

/// HTTP server for the registered routes.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Wrap `routes` (as produced by the registrar) with the middleware stack.
    pub fn new(routes: Router) -> Self {
        let router = Self::build_router(routes);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers apply bottom-up: the request ID is set before tracing opens
    /// its span, and echoed back on the response. Request timeouts are
    /// enforced per route by the registrar, which answers them itself.
    fn build_router(routes: Router) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        routes
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves, then drain.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
