// src/index/store.rs
//! Durable backing stores for the local index.
//!
//! The index only needs whole-list `load` and `save`. Any key-value or file
//! store can sit behind [`IndexStore`]; two are provided.

use crate::index::IndexError;
use crate::models::record::LocalIndexEntry;
use crate::utils::serialization::{deserialize, serialize_pretty};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Persistence for the ordered entry list.
pub trait IndexStore: Send + Sync {
    /// Returns the persisted entries, newest-anchored first; empty if none.
    fn load(&self) -> Result<Vec<LocalIndexEntry>, IndexError>;

    /// Replaces the persisted entries.
    fn save(&self, entries: &[LocalIndexEntry]) -> Result<(), IndexError>;
}

/// Entries kept as a JSON array in a single file.
///
/// Saves write a sibling temp file, sync it to disk and rename it over the
/// target, then sync the directory. A crash or power loss mid-save leaves
/// either the old or the new list, never a torn or empty one.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl IndexStore for JsonFileStore {
    fn load(&self) -> Result<Vec<LocalIndexEntry>, IndexError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(deserialize(&contents)?)
    }

    fn save(&self, entries: &[LocalIndexEntry]) -> Result<(), IndexError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serialize_pretty(&entries)?;
        let temp = self.temp_path();
        let mut file = File::create(&temp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp, &self.path)?;
        sync_dir(&self.path);
        Ok(())
    }
}

/// Makes the rename itself durable. Best effort: not every platform lets a
/// directory be opened for syncing.
fn sync_dir(path: &Path) {
    let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => parent,
        None => Path::new("."),
    };
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

/// Volatile store; entries live as long as the process.
#[derive(Default)]
pub struct MemoryIndexStore {
    entries: Mutex<Vec<LocalIndexEntry>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IndexStore for MemoryIndexStore {
    fn load(&self) -> Result<Vec<LocalIndexEntry>, IndexError> {
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, entries: &[LocalIndexEntry]) -> Result<(), IndexError> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries.to_vec();
        Ok(())
    }
}
