//! Typed route registration and validation for HTTP services.
//!
//! Feature modules describe endpoints as `"METHOD /path/:param"` keys with a
//! params schema, an optional response schema and an async handler. The
//! registrar installs them on an axum router and owns everything between the
//! socket and the handler: input decoding, error classification, and
//! client-disconnect detection.

pub mod admin;
pub mod cases;
pub mod codec;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::ServerConfig;
pub use error::{DomainError, ErrorKind, RouteConfigError, RouteError, UpstreamError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
