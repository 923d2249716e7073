//! Work catalog module
//!
//! This module holds the harvested data model and the catalog that indexes it:
//!
//! - `Record`: one listing entry with its fields, reviews and resume cursor
//! - `Item`: one review collected from a record's paginated review list
//! - `ResumeCursor`: the last fully collected review page
//! - `Catalog`: records keyed by stable identity, in insertion order

mod catalog;
mod record;

pub use catalog::{Catalog, MergePolicy};
pub use record::{Item, Record, ResumeCursor, MAX_ITEM_RATING};
