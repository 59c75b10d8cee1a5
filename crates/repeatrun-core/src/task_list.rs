//! Task list types: the ordered set of items one run iterates over.

use crate::{CoreError, TaskListId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A single unit of repetitive work (e.g. one county name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Opaque identifier for the item. Never blank.
    pub name: String,

    /// Optional metadata fields, in source-column order.
    pub metadata: Vec<(String, String)>,
}

impl Item {
    /// Create a new Item with no metadata.
    ///
    /// Fails if the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, CoreError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CoreError::InvalidItem("blank identifier".to_string()));
        }
        Ok(Self {
            name,
            metadata: Vec::new(),
        })
    }

    /// Builder method to add a metadata field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Get a metadata field by key.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Where a task list came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskListSource {
    /// Loaded from a tabular file already present in the store.
    LoadedFromFile { path: PathBuf },
    /// Constructed from an external item source and persisted.
    ConstructedFromSource { source: String },
}

/// Ordered collection of Items for one run.
///
/// Immutable once confirmed; never mutated during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    /// Name/key under which the list is stored.
    pub id: TaskListId,

    /// Ordered items. Never empty.
    pub items: Vec<Item>,

    /// Source provenance.
    pub source: TaskListSource,

    /// When the list was created.
    pub created_at: DateTime<Utc>,
}

impl TaskList {
    /// Create a new TaskList.
    ///
    /// Fails with `EmptyTaskList` when `items` is empty: a zero-item list
    /// is invalid and must not enter execution.
    pub fn new(
        id: TaskListId,
        items: Vec<Item>,
        source: TaskListSource,
    ) -> Result<Self, CoreError> {
        if items.is_empty() {
            return Err(CoreError::EmptyTaskList(id.into_inner()));
        }
        Ok(Self {
            id,
            items,
            source,
            created_at: Utc::now(),
        })
    }

    /// Number of items in the list.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a validly constructed list; kept for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over item names in order.
    pub fn item_names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(names: &[&str]) -> Vec<Item> {
        names.iter().map(|n| Item::new(*n).unwrap()).collect()
    }

    #[test]
    fn test_empty_list_rejected() {
        let result = TaskList::new(
            TaskListId::new("empty"),
            Vec::new(),
            TaskListSource::ConstructedFromSource {
                source: "test".to_string(),
            },
        );
        assert!(matches!(result, Err(CoreError::EmptyTaskList(_))));
    }

    #[test]
    fn test_blank_item_rejected() {
        assert!(matches!(Item::new("  "), Err(CoreError::InvalidItem(_))));
        assert!(matches!(Item::new(""), Err(CoreError::InvalidItem(_))));
    }

    #[test]
    fn test_item_order_preserved() {
        let list = TaskList::new(
            TaskListId::new("md-counties"),
            items(&["Allegany", "Anne Arundel", "Baltimore"]),
            TaskListSource::LoadedFromFile {
                path: PathBuf::from("md-counties.csv"),
            },
        )
        .unwrap();

        assert_eq!(list.len(), 3);
        let names: Vec<&str> = list.item_names().collect();
        assert_eq!(names, vec!["Allegany", "Anne Arundel", "Baltimore"]);
    }

    #[test]
    fn test_item_metadata() {
        let item = Item::new("Baltimore")
            .unwrap()
            .with_field("fips", "24005")
            .with_field("seat", "Towson");

        assert_eq!(item.field("fips"), Some("24005"));
        assert_eq!(item.field("seat"), Some("Towson"));
        assert_eq!(item.field("missing"), None);
    }
}
