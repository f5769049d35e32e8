//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Collect routes → Start context → Register routes → Bind listener
//!
//! Shutdown (shutdown.rs, signals.rs):
//!     SIGTERM/SIGINT or Shutdown::trigger → Stop accepting → Drain → Stop context
//! ```
//!
//! # Design Decisions
//! - Ordered startup: routes first, then dependencies, then listener
//! - Dependencies live in an explicit `ServiceContext`, not in globals

pub mod context;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use context::{LifecycleError, ServiceContext};
pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use startup::{build_application, build_repository, AppDependencies, Application, StartupError};
