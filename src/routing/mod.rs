//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Feature module (at startup):
//!     "METHOD /path/:param" + params schema + handler + options
//!     → endpoint.rs (parse key, build EndpointDescriptor)
//!     → repository.rs (collect under canonical key, merge repositories)
//!     → handed to http::registrar
//!
//! Per request (inside the registrar):
//!     handler.rs (HandlerResources in → Reply | RouteError out)
//! ```
//!
//! # Design Decisions
//! - Repositories are built at startup, immutable at runtime
//! - Keys are canonical, so `:id` and `{id}` spellings collide
//! - Handlers are plain async closures; no trait objects leak into features

pub mod endpoint;
pub mod handler;
pub mod repository;

pub use endpoint::{parse_endpoint, EndpointDescriptor, HttpMethod, ParsedEndpoint, RouteOptions};
pub use handler::{
    DecodedParams, HandlerResources, HandlerResult, Reply, RequestContext, RequestInfo, RouteLogger,
};
pub use repository::{RouteRepository, RouteSummary};
