//! Identity-keyed catalog of records
//!
//! The catalog keeps records in first-seen order so that the checkpoint file
//! stays stable between flushes, and indexes them by identity for merging.

use crate::catalog::record::Record;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// How an incoming record is merged over an existing one with the same identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Keep an existing record that already has reviews; the incoming one is skipped.
    /// An existing record without reviews keeps what it holds and only gains
    /// the incoming fields it lacks.
    KeepComplete,

    /// Always replace the existing record (forced re-fetch)
    Refresh,
}

/// Records keyed by identity, in insertion order
///
/// Checkpoint entries that do not decode as records are carried along
/// untouched and written back after the records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<Record>,
    index: HashMap<String, usize>,
    unparsed: Vec<Value>,
}

impl Catalog {
    /// Creates an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from records; later duplicates replace earlier ones in place
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut catalog = Self::new();
        for record in records {
            catalog.upsert(record);
        }
        catalog
    }

    /// Parses a checkpoint document into a catalog
    ///
    /// The document is a JSON array of records. Malformed input never fails:
    /// an unparsable document yields an empty catalog, and individual entries
    /// that are not valid records (for example, missing their `link`) are
    /// kept aside as raw JSON so a later flush does not lose them. Both cases
    /// are logged.
    pub fn load(text: &str) -> Self {
        let entries: Vec<Value> = match serde_json::from_str(text) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Could not decode checkpoint data, starting empty: {}", e);
                return Self::new();
            }
        };

        let mut catalog = Self::new();
        for (position, entry) in entries.into_iter().enumerate() {
            match Record::deserialize(&entry) {
                Ok(record) => {
                    catalog.upsert(record);
                }
                Err(e) => {
                    tracing::warn!("Keeping undecodable checkpoint entry {} as is: {}", position, e);
                    catalog.unparsed.push(entry);
                }
            }
        }

        tracing::debug!("Loaded {} records from checkpoint data", catalog.len());
        catalog
    }

    /// Serializes the catalog as a pretty-printed JSON array
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut entries = self
            .records
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<Value>>>()?;
        entries.extend(self.unparsed.iter().cloned());
        serde_json::to_string_pretty(&entries)
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the catalog holds no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true if a record with this identity exists
    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    /// Gets a record by identity
    pub fn get(&self, identity: &str) -> Option<&Record> {
        self.index.get(identity).map(|&i| &self.records[i])
    }

    /// Iterates over records in insertion order
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Inserts a record or replaces the one with the same identity in place
    ///
    /// Returns the replaced record, if any.
    pub fn upsert(&mut self, record: Record) -> Option<Record> {
        let identity = record.identity();
        match self.index.get(&identity) {
            Some(&i) => Some(std::mem::replace(&mut self.records[i], record)),
            None => {
                self.index.insert(identity, self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    /// Merges incoming records according to the policy
    ///
    /// Returns the identities of the records that were inserted or replaced
    /// and therefore still need detail work, in incoming order and without
    /// duplicates.
    pub fn merge(
        &mut self,
        incoming: impl IntoIterator<Item = Record>,
        policy: MergePolicy,
    ) -> Vec<String> {
        let mut pending: Vec<String> = Vec::new();

        for record in incoming {
            let identity = record.identity();

            let position = self.index.get(&identity).copied();
            match (policy, position) {
                (MergePolicy::KeepComplete, Some(i)) => {
                    let existing = &mut self.records[i];
                    if existing.has_items() {
                        tracing::debug!("Skipping already harvested record: {}", identity);
                        continue;
                    }
                    existing.absorb_fields(record);
                }
                _ => {
                    self.upsert(record);
                }
            }
            if !pending.contains(&identity) {
                pending.push(identity);
            }
        }

        pending
    }

    /// Overlays every record of `other` onto this catalog (other wins)
    pub fn overlay(&mut self, other: &Catalog) {
        for record in other.records() {
            self.upsert(record.clone());
        }
    }

    /// Identities of records that have no reviews yet
    pub fn missing_items(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|r| !r.has_items())
            .map(|r| r.identity())
            .collect()
    }
}
