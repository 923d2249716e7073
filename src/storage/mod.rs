//! Storage module for persisting harvest progress
//!
//! This module handles the checkpoint file of a run:
//! - Loading previously harvested records
//! - Read-merge-write flushes after every page and record
//! - Atomic replacement so an interrupted write never corrupts the file

mod json;
mod traits;

pub use json::JsonCheckpointStore;
pub use traits::{ActiveRecord, CheckpointStore, StorageError, StorageResult};

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Opens the JSON checkpoint store for a path
///
/// # Arguments
///
/// * `path` - Path to the checkpoint file; it does not need to exist
///
/// # Returns
///
/// * `Ok(JsonCheckpointStore)` - Store ready for loading and flushing
/// * `Err(StorageError)` - The parent directory could not be created
pub fn open_store(path: &Path) -> StorageResult<JsonCheckpointStore> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(JsonCheckpointStore::new(path))
}

/// Replaces a file's content through a temporary sibling and a rename
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = Path::new(&temp_name);

    let mut file = File::create(temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;

    fs::rename(temp_path, path)
}
