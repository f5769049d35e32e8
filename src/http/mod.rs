//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (middleware: request ID, trace span, timeout)
//!     → registrar.rs (axum route matched; path params + body extracted)
//!     → dispatch.rs (decode → handler → classify)
//!     → response.rs (one RouteResponse → HTTP response)
//!
//! Client disconnect at any point after extraction:
//!     → abort.rs (drop guard trips the abort signal, records 499)
//! ```
//!
//! # Design Decisions
//! - Server specifics stay behind `HttpServerSetup` / `RouteRegistrar`
//! - Each request ends in exactly one response or one recorded abort

pub mod abort;
pub mod dispatch;
pub mod middleware;
pub mod registrar;
pub mod request;
pub mod response;
pub mod server;

pub use abort::{AbortSignal, InFlight};
pub use dispatch::{classify_error, dispatch, Classification, ErrorClass, RequestState};
pub use registrar::{
    register_routes, AxumRouter, AxumServerSetup, HttpServerSetup, RawHandler, RouteRegistrar,
    RouteSpec,
};
pub use request::{RawRequest, X_REQUEST_ID};
pub use response::{ErrorBody, ResponseFactory, RouteResponse};
pub use server::HttpServer;
