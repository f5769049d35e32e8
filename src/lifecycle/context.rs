//! Explicit dependency context.
//!
//! Feature state (stores, caches, route tables) hangs off one context that is
//! started before traffic is accepted and stopped after the server drains.

use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("service context already started")]
    AlreadyStarted,

    #[error("service context not started")]
    NotStarted,
}

/// Holds the dependencies handed to every handler between `start` and `stop`.
#[derive(Debug)]
pub struct ServiceContext<D> {
    dependencies: Mutex<Option<Arc<D>>>,
}

impl<D> Default for ServiceContext<D> {
    fn default() -> Self {
        Self {
            dependencies: Mutex::new(None),
        }
    }
}

impl<D> ServiceContext<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, dependencies: D) -> Result<Arc<D>, LifecycleError> {
        let mut slot = self.dependencies.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return Err(LifecycleError::AlreadyStarted);
        }
        let dependencies = Arc::new(dependencies);
        *slot = Some(Arc::clone(&dependencies));
        tracing::debug!("Service context started");
        Ok(dependencies)
    }

    pub fn dependencies(&self) -> Result<Arc<D>, LifecycleError> {
        self.dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(LifecycleError::NotStarted)
    }

    pub fn is_started(&self) -> bool {
        self.dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Release the context's hold on the dependencies. Handlers still in
    /// flight keep their own `Arc`.
    pub fn stop(&self) -> Result<(), LifecycleError> {
        let previous = self
            .dependencies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match previous {
            Some(_) => {
                tracing::debug!("Service context stopped");
                Ok(())
            }
            None => Err(LifecycleError::NotStarted),
        }
    }
}
