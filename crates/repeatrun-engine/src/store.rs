//! Durable storage and lookup of named task lists.
//!
//! One CSV file per list under the store directory: header row, first
//! column is the item identifier, remaining columns become item metadata.

use std::fs;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use repeatrun_core::{CoreError, Item, TaskList, TaskListId, TaskListSource};

use crate::error::EngineError;

/// Directory-backed store of named task lists.
pub struct TaskListStore {
    dir: PathBuf,
}

impl TaskListStore {
    /// Open (creating if needed) a store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, EngineError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Names of all stored task lists, sorted.
    pub fn list(&self) -> Result<Vec<String>, EngineError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("csv") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Whether a list is stored under this name.
    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    /// File path a list of this name is stored at.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", sanitize_name(name)))
    }

    /// Load a stored task list by name.
    ///
    /// Rejects zero-item files and rows with a blank identifier.
    pub fn load(&self, name: &str) -> Result<TaskList, EngineError> {
        let path = self.path_for(name);
        if !path.is_file() {
            return Err(EngineError::TaskListNotFound(name.to_string()));
        }
        let items = read_items(&path)?;
        debug!(name = %name, count = items.len(), "Loaded task list");

        let list = TaskList::new(
            TaskListId::new(sanitize_name(name)),
            items,
            TaskListSource::LoadedFromFile { path },
        )?;
        Ok(list)
    }

    /// Import an external CSV file as a new task list under the given name.
    ///
    /// The file follows the task list input format: header row, first
    /// column is the item identifier, remaining columns become metadata.
    pub fn import(&self, source: &Path, name: &str) -> Result<TaskList, EngineError> {
        let items = read_items(source)?;
        self.save(name, items)
    }

    /// Save items as a new task list under the given name.
    ///
    /// Refuses to overwrite an existing list. Returns the stored list.
    pub fn save(&self, name: &str, items: Vec<Item>) -> Result<TaskList, EngineError> {
        let key = sanitize_name(name);
        let path = self.path_for(name);
        if path.exists() {
            return Err(EngineError::TaskListExists(key));
        }
        if items.is_empty() {
            return Err(CoreError::EmptyTaskList(key).into());
        }

        write_items(&path, &items)?;
        info!(name = %key, count = items.len(), path = %path.display(), "Saved task list");

        let list = TaskList::new(
            TaskListId::new(key),
            items,
            TaskListSource::LoadedFromFile { path },
        )?;
        Ok(list)
    }
}

/// Derive a filesystem-safe store key from a free-form name.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn read_items(path: &Path) -> Result<Vec<Item>, EngineError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| EngineError::StoreRead {
            path: path.to_path_buf(),
            source,
        })?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| EngineError::StoreRead {
            path: path.to_path_buf(),
            source,
        })?
        .iter()
        .map(str::to_string)
        .collect();

    let mut items = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| EngineError::StoreRead {
            path: path.to_path_buf(),
            source,
        })?;
        let name = record.get(0).unwrap_or_default();
        let mut item = Item::new(name)?;
        for (idx, header) in headers.iter().enumerate().skip(1) {
            if let Some(value) = record.get(idx) {
                item = item.with_field(header, value);
            }
        }
        items.push(item);
    }
    Ok(items)
}

fn write_items(path: &Path, items: &[Item]) -> Result<(), EngineError> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|source| EngineError::StoreWrite {
            path: path.to_path_buf(),
            source,
        })?;

    // Metadata columns come from the first item; later items contribute
    // values only for those columns.
    let columns: Vec<String> = items[0]
        .metadata
        .iter()
        .map(|(key, _)| key.clone())
        .collect();

    let mut header = vec!["name".to_string()];
    header.extend(columns.iter().cloned());
    let write_err = |source| EngineError::StoreWrite {
        path: path.to_path_buf(),
        source,
    };
    writer.write_record(&header).map_err(write_err)?;

    for item in items {
        let mut row = vec![item.name.clone()];
        for column in &columns {
            row.push(item.field(column).unwrap_or_default().to_string());
        }
        writer.write_record(&row).map_err(write_err)?;
    }
    writer.flush()?;
    Ok(())
}
