//! JSON file checkpoint backend

use crate::catalog::Catalog;
use crate::storage::traits::{ActiveRecord, CheckpointStore, StorageResult};
use crate::storage::write_atomic;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Checkpoint kept as one pretty-printed JSON array of records
#[derive(Debug, Clone)]
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    /// Creates a store for the given file; nothing is read until [`load`](CheckpointStore::load)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the file, treating a missing file as empty
    fn read_persisted(&self) -> StorageResult<Catalog> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(Catalog::load(&text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Catalog::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self) -> StorageResult<Catalog> {
        let catalog = self.read_persisted()?;
        tracing::info!(
            "Loaded {} records from {}",
            catalog.len(),
            self.path.display()
        );
        Ok(catalog)
    }

    fn flush(&self, catalog: &Catalog, active: Option<ActiveRecord<'_>>) -> StorageResult<usize> {
        let mut merged = match self.read_persisted() {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!(
                    "Could not read {} before flushing, rewriting from memory: {}",
                    self.path.display(),
                    e
                );
                Catalog::new()
            }
        };

        merged.overlay(catalog);

        if let Some(active) = active {
            let mut record = active.record.clone();
            if let Some(cursor) = active.cursor {
                record.last_review_page = Some(cursor);
            }
            merged.upsert(record);
        }

        let text = merged.to_json()?;
        write_atomic(&self.path, text.as_bytes())?;

        tracing::debug!("Flushed {} records to {}", merged.len(), self.path.display());
        Ok(merged.len())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
