//! Task list resolution: store lookup first, external construction second.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use repeatrun_core::{Item, TaskList};

use crate::error::EngineError;
use crate::store::{sanitize_name, TaskListStore};

/// Errors from an external item source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source could not be reached or refused the request.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The source answered but produced no usable rows.
    #[error("no usable rows for '{0}'")]
    NoData(String),
}

/// External collaborator that produces items for a query.
///
/// The web-search / file-download utilities live behind this seam and are
/// not specified here.
#[async_trait]
pub trait ItemSource: Send + Sync {
    /// Fetch the items matching a query.
    async fn fetch_items(&self, query: &str) -> Result<Vec<Item>, SourceError>;
}

/// Discovers an existing task list matching a request, or constructs one
/// from the external item source, persisting it so identical future
/// queries resolve without reconstruction.
pub struct TaskListResolver {
    store: Arc<TaskListStore>,
    source: Option<Arc<dyn ItemSource>>,
}

impl TaskListResolver {
    /// Create a resolver with no external source: lookup only.
    pub fn new(store: Arc<TaskListStore>) -> Self {
        Self {
            store,
            source: None,
        }
    }

    /// Builder method to attach an external item source.
    pub fn with_source(mut self, source: Arc<dyn ItemSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Resolve a query to a task list.
    ///
    /// Exact key match against the store is sufficient; fuzzy matching is
    /// the external discovery agent's job. A constructed list is stored
    /// under a name derived from the query before being returned.
    pub async fn resolve(&self, query: &str) -> Result<TaskList, EngineError> {
        let key = sanitize_name(query);
        if self.store.exists(&key) {
            debug!(query = %query, key = %key, "Resolved task list from store");
            return self.store.load(&key);
        }

        let source = self
            .source
            .as_ref()
            .ok_or_else(|| EngineError::TaskListNotFound(query.to_string()))?;

        let items = source
            .fetch_items(query)
            .await
            .map_err(|source| EngineError::Source {
                query: query.to_string(),
                source,
            })?;

        info!(query = %query, key = %key, count = items.len(), "Constructed task list from source");
        self.store.save(&key, items)
    }
}
