use crate::url::normalize::canonical_url;
use regex::Regex;
use std::sync::LazyLock;

/// Site-assigned `(shop, item)` id pair embedded in listing links, e.g. `...-i.123.456`
static ID_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"i\.(\d+)\.(\d+)").expect("id pair pattern is valid"));

/// Extracts the `(shop, item)` id pair from a listing link, if it carries one
///
/// # Examples
///
/// ```
/// use review_harvest::url::id_pair;
///
/// assert_eq!(
///     id_pair("https://shop.example/Widget-Pro-i.123.456?sp_atk=x"),
///     Some((123, 456))
/// );
/// assert_eq!(id_pair("https://shop.example/widget"), None);
/// ```
pub fn id_pair(link: &str) -> Option<(u64, u64)> {
    let captures = ID_PAIR.captures(link)?;
    let shop = captures.get(1)?.as_str().parse().ok()?;
    let item = captures.get(2)?.as_str().parse().ok()?;
    Some((shop, item))
}

/// Derives the stable identity key of a record from its link
///
/// The structured id pair wins when present, because the same listing is
/// reachable under several slugs and tracking parameters. Otherwise the
/// canonical URL is the identity.
///
/// # Examples
///
/// ```
/// use review_harvest::url::record_identity;
///
/// assert_eq!(record_identity("https://shop.example/a-i.1.2"), "1.2");
/// assert_eq!(record_identity("https://shop.example/b-i.1.2?x=1"), "1.2");
/// assert_eq!(
///     record_identity("https://shop.example/plain#top"),
///     "https://shop.example/plain"
/// );
/// ```
pub fn record_identity(link: &str) -> String {
    match id_pair(link) {
        Some((shop, item)) => format!("{}.{}", shop, item),
        None => canonical_url(link),
    }
}
