//! Storage traits and error types
//!
//! This module defines the trait interface for checkpoint backends and
//! associated error types.

use crate::catalog::{Catalog, Record, ResumeCursor};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The record currently being harvested
///
/// It is written over whatever the catalog holds for the same identity, and
/// carries the page cursor when the run resumes a single record.
#[derive(Debug, Clone, Copy)]
pub struct ActiveRecord<'a> {
    pub record: &'a Record,
    pub cursor: Option<ResumeCursor>,
}

impl<'a> ActiveRecord<'a> {
    pub fn new(record: &'a Record) -> Self {
        Self {
            record,
            cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<ResumeCursor>) -> Self {
        self.cursor = cursor;
        self
    }
}

/// Trait for checkpoint backend implementations
///
/// A flush must leave the previous checkpoint intact if it fails part way.
pub trait CheckpointStore: Send + Sync {
    /// Loads the persisted catalog
    ///
    /// A missing or undecodable checkpoint yields an empty catalog.
    fn load(&self) -> StorageResult<Catalog>;

    /// Persists the catalog merged over the current checkpoint
    ///
    /// # Arguments
    ///
    /// * `catalog` - In-memory records; they replace persisted records with
    ///   the same identity, and persisted records not in memory are kept
    /// * `active` - Record in progress, written last
    ///
    /// # Returns
    ///
    /// The number of records written
    fn flush(&self, catalog: &Catalog, active: Option<ActiveRecord<'_>>) -> StorageResult<usize>;

    /// Location of the checkpoint, for reporting
    fn location(&self) -> &Path;
}
