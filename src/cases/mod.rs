//! Case management routes.
//!
//! # Data Flow
//! ```text
//! routes.rs (descriptors: schemas.rs params/response shapes)
//!     → handlers read decoded params
//!     → store.rs (DashMap-backed connectors and comments)
//!     → results encoded through the response schema (internal keys dropped)
//! ```

pub mod routes;
pub mod schemas;
pub mod store;

pub use routes::{repository, CASES_TAG};
pub use store::ConnectorStore;

/// What the case routes need from the service's dependency bag.
pub trait CasesDependencies {
    fn connectors(&self) -> &ConnectorStore;
}
