//! Route repositories.
//!
//! # Responsibilities
//! - Collect endpoint descriptors under their canonical `METHOD /path` key
//! - Merge feature repositories at startup
//!
//! # Design Decisions
//! - Built once at startup, read-only afterwards
//! - A duplicate key is a fatal configuration error, never an overwrite
//! - BTreeMap keeps registration order deterministic across runs

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::RouteConfigError;
use crate::routing::endpoint::{EndpointDescriptor, HttpMethod};

/// Named set of endpoint descriptors exposed by a feature module.
pub struct RouteRepository<D> {
    routes: BTreeMap<String, EndpointDescriptor<D>>,
}

impl<D> Default for RouteRepository<D> {
    fn default() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }
}

impl<D> Clone for RouteRepository<D> {
    fn clone(&self) -> Self {
        Self {
            routes: self.routes.clone(),
        }
    }
}

impl<D> std::fmt::Debug for RouteRepository<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.routes.keys()).finish()
    }
}

/// Summary of one registered endpoint, for introspection endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub endpoint: String,
    pub method: HttpMethod,
    pub path: String,
    pub tags: Vec<String>,
}

impl<D> RouteRepository<D> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn add(mut self, descriptor: EndpointDescriptor<D>) -> Result<Self, RouteConfigError> {
        self.insert(descriptor)?;
        Ok(self)
    }

    pub fn insert(&mut self, descriptor: EndpointDescriptor<D>) -> Result<(), RouteConfigError> {
        let key = descriptor.endpoint().to_string();
        if self.routes.contains_key(&key) {
            return Err(RouteConfigError::DuplicateEndpoint(key));
        }
        self.routes.insert(key, descriptor);
        Ok(())
    }

    /// Union of both repositories. Fails on the first key present in both.
    pub fn merge(mut self, other: RouteRepository<D>) -> Result<Self, RouteConfigError> {
        if let Some(key) = other.routes.keys().find(|k| self.routes.contains_key(*k)) {
            return Err(RouteConfigError::DuplicateEndpoint(key.clone()));
        }
        self.routes.extend(other.routes);
        Ok(self)
    }

    pub fn get(&self, endpoint: &str) -> Option<&EndpointDescriptor<D>> {
        self.routes.get(endpoint)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EndpointDescriptor<D>> {
        self.routes.values()
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    pub fn summaries(&self) -> Vec<RouteSummary> {
        self.routes
            .values()
            .map(|d| RouteSummary {
                endpoint: d.endpoint().to_string(),
                method: d.method(),
                path: d.path().to_string(),
                tags: d.options().tags.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::handler::Reply;

    fn endpoint(key: &str) -> EndpointDescriptor<()> {
        EndpointDescriptor::new(key, |_| async { Ok(Reply::NoContent) }).unwrap()
    }

    #[test]
    fn test_add_rejects_duplicate_key() {
        let repo = RouteRepository::new().add(endpoint("GET /x")).unwrap();
        let err = repo.add(endpoint("get /x")).unwrap_err();
        assert_eq!(err, RouteConfigError::DuplicateEndpoint("GET /x".into()));
    }

    #[test]
    fn test_merge_collision_is_fatal() {
        let a = RouteRepository::new()
            .add(endpoint("GET /x"))
            .unwrap()
            .add(endpoint("POST /x"))
            .unwrap();
        let b = RouteRepository::new().add(endpoint("GET /x")).unwrap();
        let err = a.merge(b).unwrap_err();
        assert_eq!(err, RouteConfigError::DuplicateEndpoint("GET /x".into()));
    }

    #[test]
    fn test_merge_unions_disjoint_repositories() {
        let a = RouteRepository::new().add(endpoint("GET /a")).unwrap();
        let b = RouteRepository::new()
            .add(endpoint("GET /b/:id"))
            .unwrap()
            .add(endpoint("DELETE /b/:id"))
            .unwrap();
        let merged = a.merge(b).unwrap();
        assert_eq!(merged.len(), 3);
        let keys: Vec<_> = merged.endpoints().collect();
        assert_eq!(keys, vec!["DELETE /b/{id}", "GET /a", "GET /b/{id}"]);
    }

    #[test]
    fn test_equivalent_param_syntax_collides() {
        let repo = RouteRepository::new().add(endpoint("GET /b/:id")).unwrap();
        assert!(repo.add(endpoint("GET /b/{id}")).is_err());
    }
}
