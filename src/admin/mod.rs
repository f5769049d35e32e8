//! Internal introspection routes.
//!
//! `/internal/status` is open; `/internal/routes` is tagged `access:admin`
//! and sits behind the admin API key when admin is enabled.

pub mod handlers;

use std::time::Instant;

use crate::error::RouteConfigError;
use crate::http::middleware::ADMIN_TAG;
use crate::routing::{EndpointDescriptor, RouteOptions, RouteRepository, RouteSummary};
use self::handlers::{get_routes, get_status};

/// What the admin routes need from the service's dependency bag.
pub trait AdminDependencies {
    fn route_summaries(&self) -> &[RouteSummary];
    fn started_at(&self) -> Instant;
}

pub fn repository<D>() -> Result<RouteRepository<D>, RouteConfigError>
where
    D: AdminDependencies + Send + Sync + 'static,
{
    RouteRepository::new()
        .add(EndpointDescriptor::new("GET /internal/status", get_status::<D>)?)?
        .add(
            EndpointDescriptor::new("GET /internal/routes", get_routes::<D>)?
                .with_params(handlers::routes_params())
                .with_options(RouteOptions::tagged([ADMIN_TAG])),
        )
}
