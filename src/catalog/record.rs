//! Record and item definitions
//!
//! These types are serialized directly into the checkpoint file, so their
//! field names are the on-disk format.

use crate::url::record_identity;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Highest star rating an item can carry
pub const MAX_ITEM_RATING: u8 = 5;

/// Last review page whose items were fully collected (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResumeCursor(u32);

impl ResumeCursor {
    /// Creates a cursor for the given completed page
    ///
    /// Page numbers are 1-based; `0` is raised to `1`.
    pub fn new(page: u32) -> Self {
        Self(page.max(1))
    }

    /// The last completed page
    pub fn page(&self) -> u32 {
        self.0
    }

    /// The page a resumed collection starts on
    pub fn next_page(&self) -> u32 {
        self.0.saturating_add(1)
    }
}

impl fmt::Display for ResumeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}

/// One review collected from a record
///
/// Every field has a default so that a review with missing elements is still
/// recorded with empty values instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    pub author: String,
    pub author_profile_url: String,
    pub rating: u8,
    pub content: String,
    pub time: String,
    pub seller_respond: String,
    pub like_count: u64,
    pub images: Vec<String>,
    pub videos: Vec<String>,
}

impl Item {
    /// Converts a count of highlighted stars into a bounded rating
    pub fn bounded_rating(stars: usize) -> u8 {
        stars.min(MAX_ITEM_RATING as usize) as u8
    }
}

/// One harvested listing entry
///
/// The link is fixed at construction; the identity derived from it never
/// changes afterwards. Named fields (name, price, shop reference, ...) are
/// filled progressively by the field extractor and stored as JSON values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    link: String,

    /// Collected reviews, in collection order
    #[serde(default)]
    pub comments: Vec<Item>,

    /// Review counts per filter key (`5_star`, `media`, ...)
    #[serde(default)]
    pub detailed_rating: BTreeMap<String, u64>,

    /// Sum of the star-filter counts
    #[serde(default)]
    pub total_rating: u64,

    /// Resume cursor for single-record continuation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_review_page: Option<ResumeCursor>,

    /// Site-specific fields
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates an empty record for a link
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into().trim().to_string(),
            comments: Vec::new(),
            detailed_rating: BTreeMap::new(),
            total_rating: 0,
            last_review_page: None,
            fields: BTreeMap::new(),
        }
    }

    /// The link the record was created from
    pub fn link(&self) -> &str {
        &self.link
    }

    /// The stable identity key of this record
    pub fn identity(&self) -> String {
        record_identity(&self.link)
    }

    /// Returns true once at least one review has been collected
    pub fn has_items(&self) -> bool {
        !self.comments.is_empty()
    }

    /// Gets a named field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Sets a named field, replacing any previous value
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// Sets a named field only if it is not present yet
    ///
    /// Returns true if the value was stored.
    pub fn set_field_if_absent(&mut self, name: &str, value: impl Into<Value>) -> bool {
        if self.fields.contains_key(name) {
            return false;
        }
        self.fields.insert(name.to_string(), value.into());
        true
    }

    /// Takes the fields of another sighting of this record that are missing here
    ///
    /// Reviews, ratings and the resume cursor of `self` are left as they are.
    pub fn absorb_fields(&mut self, other: Record) {
        for (name, value) in other.fields {
            self.set_field_if_absent(&name, value);
        }
    }

    /// Clears rating data when the review section never rendered
    pub fn clear_rating(&mut self) {
        self.detailed_rating.clear();
        self.total_rating = 0;
    }
}
