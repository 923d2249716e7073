//! URL handling module for Review-Harvest
//!
//! This module provides link canonicalization, record identity derivation,
//! domain extraction for the cookie jar, and the naming rules that map a
//! crawl target to its search URL and checkpoint file.

mod domain;
mod identity;
mod normalize;

// Re-export main functions
pub use domain::{cookie_domain_matches, domain_of, extract_domain};
pub use identity::{id_pair, record_identity};
pub use normalize::{canonical_url, resolve_link};

/// Builds the listing search URL for a query
///
/// The pattern must contain a `{query}` placeholder. Each whitespace-separated
/// word is form-encoded and the words are joined with `%20`.
///
/// # Examples
///
/// ```
/// use review_harvest::url::search_url;
///
/// let url = search_url("https://shop.example/search?keyword={query}&page=0", "  usb  hub ");
/// assert_eq!(url, "https://shop.example/search?keyword=usb%20hub&page=0");
/// ```
pub fn search_url(pattern: &str, query: &str) -> String {
    let encoded = query
        .split_whitespace()
        .map(|word| ::url::form_urlencoded::byte_serialize(word.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("%20");
    pattern.replace("{query}", &encoded)
}

/// Derives the checkpoint file name for a single-record crawl
///
/// Links that carry an id pair produce `<prefix>_<shop>_<item>.json`; other
/// links fall back to `<prefix>_link.json`.
pub fn checkpoint_name_for_link(prefix: &str, link: &str) -> String {
    match id_pair(link) {
        Some((shop, item)) => format!("{}_{}_{}.json", prefix, shop, item),
        None => format!("{}_link.json", prefix),
    }
}

/// Derives the checkpoint file name for a catalog search
///
/// The query is lowercased and reduced to `[a-z0-9_]`; an empty result falls
/// back to `<prefix>_output.json`.
pub fn checkpoint_name_for_query(prefix: &str, query: &str) -> String {
    let safe: String = query
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();
    if safe.is_empty() {
        format!("{}_output.json", prefix)
    } else {
        format!("{}_{}.json", prefix, safe)
    }
}
