//! Startup orchestration.
//!
//! # Responsibilities
//! - Collect every feature's routes into one repository
//! - Start the service context with the shared dependencies
//! - Register routes on the HTTP server and wrap them in middleware
//!
//! # Design Decisions
//! - Fail fast: any route configuration error is fatal
//! - The listener is bound by the caller, after the application is built,
//!   so traffic only arrives once routes exist

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{self, AdminDependencies};
use crate::cases::{self, CasesDependencies, ConnectorStore};
use crate::config::ServerConfig;
use crate::error::RouteConfigError;
use crate::http::{register_routes, AxumServerSetup, HttpServer};
use crate::lifecycle::context::{LifecycleError, ServiceContext};
use crate::routing::{RouteRepository, RouteSummary};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("route configuration error: {0}")]
    Routes(#[from] RouteConfigError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Dependencies shared by every route of the service.
#[derive(Debug)]
pub struct AppDependencies {
    pub connectors: ConnectorStore,
    routes: Vec<RouteSummary>,
    started_at: Instant,
}

impl AppDependencies {
    pub fn new(routes: Vec<RouteSummary>) -> Self {
        Self {
            connectors: ConnectorStore::new(),
            routes,
            started_at: Instant::now(),
        }
    }
}

impl CasesDependencies for AppDependencies {
    fn connectors(&self) -> &ConnectorStore {
        &self.connectors
    }
}

impl AdminDependencies for AppDependencies {
    fn route_summaries(&self) -> &[RouteSummary] {
        &self.routes
    }

    fn started_at(&self) -> Instant {
        self.started_at
    }
}

/// Every route the service exposes.
pub fn build_repository() -> Result<RouteRepository<AppDependencies>, RouteConfigError> {
    cases::repository()?.merge(admin::repository()?)
}

/// A fully wired service, ready to be bound to a listener.
pub struct Application {
    server: HttpServer,
    context: ServiceContext<AppDependencies>,
}

pub fn build_application(config: &ServerConfig) -> Result<Application, StartupError> {
    let repository = build_repository()?;
    let context = ServiceContext::new();
    let dependencies = context.start(AppDependencies::new(repository.summaries()))?;

    let mut setup = AxumServerSetup::new()
        .with_body_limit(config.limits.max_body_bytes)
        .with_request_timeout(Duration::from_secs(config.timeouts.request_secs));
    if config.admin.enabled {
        setup = setup.with_admin_api_key(config.admin.api_key.as_str());
    }

    let routes = register_routes(&setup, &repository, dependencies).into_router();
    let server = HttpServer::new(routes);

    tracing::info!(
        routes = repository.len(),
        admin_auth = config.admin.enabled,
        "Application built"
    );
    Ok(Application { server, context })
}

impl Application {
    /// The layered router, for in-process requests.
    pub fn router(&self) -> axum::Router {
        self.server.router()
    }

    pub fn dependencies(&self) -> Result<Arc<AppDependencies>, LifecycleError> {
        self.context.dependencies()
    }

    /// Serve until `shutdown` resolves, then stop the service context.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Application { server, context } = self;
        let result = server.run(listener, shutdown).await;
        if let Err(e) = context.stop() {
            tracing::warn!(error = %e, "Service context was not running at shutdown");
        }
        result
    }
}
