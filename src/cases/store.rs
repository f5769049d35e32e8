//! In-memory connector and comment storage.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::error::DomainError;

/// Key holding the storage revision of a connector. Never sent to clients.
pub const INTERNAL_VERSION: &str = "internalVersion";

#[derive(Debug, Default)]
pub struct ConnectorStore {
    connectors: DashMap<String, Value>,
    comments: DashMap<String, Vec<Value>>,
    version: AtomicU64,
}

impl ConnectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a decoded connector. Fails with a conflict if the id is taken.
    pub fn insert(&self, id: &str, connector: Value) -> Result<Value, DomainError> {
        match self.connectors.entry(id.to_string()) {
            Entry::Occupied(_) => Err(DomainError::conflict(format!(
                "Connector '{}' already exists",
                id
            ))),
            Entry::Vacant(slot) => {
                let mut stored = connector;
                let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
                if let Value::Object(fields) = &mut stored {
                    fields.insert(INTERNAL_VERSION.to_string(), json!(version));
                }
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Value> {
        self.connectors.get(id).map(|entry| entry.value().clone())
    }

    /// Connectors ordered by id, at most `limit` of them.
    pub fn list(&self, limit: Option<usize>) -> Vec<Value> {
        let mut all: Vec<(String, Value)> = self
            .connectors
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all.into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|(_, v)| v)
            .collect()
    }

    pub fn remove(&self, id: &str) -> Option<Value> {
        self.connectors.remove(id).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }

    /// Record a comment action against a case and return it with its new id.
    pub fn add_comment(&self, case_id: &str, action: Value) -> Value {
        let mut recorded = action;
        if let Value::Object(fields) = &mut recorded {
            fields.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
            fields.insert("caseId".to_string(), json!(case_id));
        }
        self.comments
            .entry(case_id.to_string())
            .or_default()
            .push(recorded.clone());
        recorded
    }

    pub fn comment_count(&self, case_id: &str) -> usize {
        self.comments.get(case_id).map(|c| c.len()).unwrap_or(0)
    }
}
