//! Rating filter parsing
//!
//! Detail pages show one filter entry per sub-view, labelled with a count
//! in parentheses: `5 Estrelas (1,2mil)`, `Com Mídia (37)`. This module
//! turns those labels into stable keys and counts, and re-activates a
//! filter by key after the page has changed underneath earlier handles.

use crate::config::{SessionConfig, VocabularyConfig};
use crate::render::{ElementHandle, Locator, RenderClient};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

static FILTER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(.+?)\s*\(\s*([\d.,]+\s*\p{L}*)\s*\)").expect("filter label pattern is valid")
});

/// Converts an abbreviated count such as `1,2mil` or `3.5k` to an integer
///
/// A configured magnitude suffix multiplies by one thousand and a comma is
/// read as the decimal separator. Anything unparsable yields 0.
///
/// # Arguments
///
/// * `text` - Raw count text
/// * `suffixes` - Magnitude suffixes, matched case-insensitively
pub fn shortened_number_to_int(text: &str, suffixes: &[String]) -> u64 {
    let mut cleaned = text.trim().to_lowercase();
    let mut multiplier = 1.0;

    for suffix in suffixes {
        let suffix = suffix.to_lowercase();
        if !suffix.is_empty() && cleaned.contains(&suffix) {
            cleaned = cleaned.replace(&suffix, "");
            multiplier = 1000.0;
            break;
        }
    }

    let cleaned = cleaned.trim().replace(',', ".");
    let number: f64 = match cleaned.parse() {
        Ok(n) => n,
        Err(_) => return 0,
    };
    if !number.is_finite() || number < 0.0 {
        return 0;
    }

    // 4.1 * 1000 lands just below 4100 in binary floating point
    let product = number * multiplier;
    let nearest = product.round();
    if (product - nearest).abs() < 1e-6 {
        nearest as u64
    } else {
        product.trunc() as u64
    }
}

/// Maps a filter label to its stable key
///
/// Labels starting with a digit 1-5 become `<d>_star`; labels containing
/// a synonym from the vocabulary become `all`, `commented` or `media`;
/// anything else is lowercased with whitespace runs replaced by `_`.
pub fn normalize_label(label: &str, vocabulary: &VocabularyConfig) -> String {
    let lower = label.trim().to_lowercase();

    if let Some(first) = lower.chars().next() {
        if ('1'..='5').contains(&first) {
            return format!("{}_star", first);
        }
    }

    let matches = |synonyms: &[String]| {
        synonyms
            .iter()
            .any(|s| !s.is_empty() && lower.contains(&s.to_lowercase()))
    };
    if matches(&vocabulary.all) {
        return "all".to_string();
    }
    if matches(&vocabulary.commented) {
        return "commented".to_string();
    }
    if matches(&vocabulary.media) {
        return "media".to_string();
    }

    lower.split_whitespace().collect::<Vec<_>>().join("_")
}

/// One parsed rating filter entry
#[derive(Debug, Clone, PartialEq)]
pub struct FilterDescriptor {
    /// Text as rendered
    pub raw: String,
    /// Label without the count
    pub label: String,
    /// Normalized key
    pub key: String,
    /// Count, when the text carried a parsable one
    pub count: Option<u64>,
    /// Element the text was read from
    pub element: ElementHandle,
}

impl FilterDescriptor {
    /// Parses the rendered text of a filter entry
    pub fn parse(raw: &str, element: ElementHandle, vocabulary: &VocabularyConfig) -> Self {
        match FILTER_LABEL.captures(raw) {
            Some(caps) => {
                let label = caps[1].trim().to_string();
                let count = shortened_number_to_int(&caps[2], &vocabulary.magnitude_suffixes);
                Self {
                    raw: raw.to_string(),
                    key: normalize_label(&label, vocabulary),
                    label,
                    count: Some(count),
                    element,
                }
            }
            None => Self {
                raw: raw.to_string(),
                label: raw.trim().to_string(),
                key: normalize_label(raw, vocabulary),
                count: None,
                element,
            },
        }
    }

    pub fn is_star(&self) -> bool {
        self.key.ends_with("_star")
    }
}

/// Builds the per-key counts and the sum over the star keys
pub fn extract_detailed_rating(filters: &[FilterDescriptor]) -> (BTreeMap<String, u64>, u64) {
    let mut detailed = BTreeMap::new();
    let mut total: u64 = 0;

    for filter in filters {
        match filter.count {
            Some(count) => {
                if filter.is_star() {
                    total = total.saturating_add(count);
                }
                detailed.insert(filter.key.clone(), count);
            }
            None => tracing::warn!("Could not parse rating filter '{}'", filter.raw),
        }
    }

    (detailed, total)
}

/// Reads and activates rating filters on the current detail page
#[derive(Debug, Clone)]
pub struct RatingFilters {
    vocabulary: VocabularyConfig,
    timeout: Duration,
    poll: Duration,
    click_settle: Duration,
}

impl RatingFilters {
    pub fn new(vocabulary: VocabularyConfig, session: &SessionConfig) -> Self {
        Self {
            vocabulary,
            timeout: session.filter_timeout(),
            poll: session.poll_interval(),
            click_settle: session.click_settle(),
        }
    }

    /// Reads every filter entry with non-empty text
    ///
    /// Waits up to the filter timeout for at least one labelled entry.
    /// Never fails: a page without filters yields an empty list.
    pub async fn parse(&self, client: &dyn RenderClient, locator: &Locator) -> Vec<FilterDescriptor> {
        let deadline = tokio::time::Instant::now() + self.timeout;

        loop {
            let descriptors = self.read(client, locator).await;
            if !descriptors.is_empty() {
                tracing::debug!("Found {} rating filters", descriptors.len());
                return descriptors;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!("No rating filters rendered within {:?}", self.timeout);
                return Vec::new();
            }
            tokio::time::sleep(self.poll).await;
        }
    }

    async fn read(&self, client: &dyn RenderClient, locator: &Locator) -> Vec<FilterDescriptor> {
        let elements = match client.find_many(None, locator).await {
            Ok(elements) => elements,
            Err(e) => {
                tracing::debug!("Rating filter lookup failed: {}", e);
                return Vec::new();
            }
        };

        let mut descriptors = Vec::with_capacity(elements.len());
        for element in elements {
            match client.text(&element).await {
                Ok(text) if !text.trim().is_empty() => {
                    descriptors.push(FilterDescriptor::parse(&text, element, &self.vocabulary));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!("Could not read rating filter: {}", e),
            }
        }
        descriptors
    }

    /// Clicks the filter with the given key
    ///
    /// Filters are looked up again so that handles from an earlier page
    /// are never reused. Returns false if no such filter could be clicked.
    pub async fn activate(
        &self,
        client: &mut dyn RenderClient,
        locator: &Locator,
        key: &str,
    ) -> bool {
        let current = self.read(&*client, locator).await;
        let Some(filter) = current.into_iter().find(|f| f.key == key) else {
            tracing::warn!("Rating filter '{}' is not on the page", key);
            return false;
        };

        if let Err(e) = client.click(&filter.element).await {
            tracing::warn!("Could not activate rating filter '{}': {}", key, e);
            return false;
        }
        tokio::time::sleep(self.click_settle).await;
        tracing::debug!("Activated rating filter '{}'", filter.label);
        true
    }
}
