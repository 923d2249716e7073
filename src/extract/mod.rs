//! Field extraction module for Review-Harvest
//!
//! Converts located elements into record fields and review items. The
//! harvesting core only consumes the output shape; which elements hold
//! which values is a property of the site layout and lives in the
//! configured selector map.
//!
//! Extraction never fails: a field that cannot be located is absent, an
//! item part that cannot be read keeps its default value.

mod selector;

pub use selector::SelectorExtractor;

use crate::catalog::{Item, Record};
use crate::render::{ElementHandle, Locator, RenderClient};
use async_trait::async_trait;

/// Converts rendered elements into typed values
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    /// Reads up to `max` listing entries from the current search page
    ///
    /// Entries without a usable link are skipped.
    async fn listing(&self, client: &dyn RenderClient, max: usize) -> Vec<Record>;

    /// Fills the record's named fields from the current detail page
    async fn detail_fields(&self, client: &dyn RenderClient, record: &mut Record);

    /// Reads one rendered review
    async fn item(&self, client: &dyn RenderClient, element: &ElementHandle) -> Item;

    /// Locator of the rendered reviews
    fn item_locator(&self) -> Locator;

    /// Locator of the rating filter entries
    fn filter_locator(&self) -> Locator;

    /// Locator of the numbered page controls
    fn page_button_locator(&self) -> Locator;
}
