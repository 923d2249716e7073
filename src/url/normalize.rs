use url::Url;

/// Query parameters that vary between visits to the same listing
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "sp_atk",
    "xptdk",
    "ref",
];

/// Canonicalizes a record link so that repeat visits map to the same string
///
/// # Canonicalization Steps
///
/// 1. Trim surrounding whitespace
/// 2. Parse the URL; if it does not parse, the trimmed input is returned unchanged
/// 3. Lowercase the host (done by the parser)
/// 4. Remove the fragment
/// 5. Remove tracking query parameters and sort the rest
/// 6. Remove an empty query string
///
/// The function is total: every input produces some canonical string.
///
/// # Examples
///
/// ```
/// use review_harvest::url::canonical_url;
///
/// assert_eq!(
///     canonical_url("https://Shop.Example/p/1?utm_source=x&b=2&a=1#reviews"),
///     "https://shop.example/p/1?a=1&b=2"
/// );
/// assert_eq!(canonical_url("  not a url "), "not a url");
/// ```
pub fn canonical_url(link: &str) -> String {
    let trimmed = link.trim();
    let mut url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => return trimmed.to_string(),
    };

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = params
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        k.clone()
                    } else {
                        format!("{}={}", k, v)
                    }
                })
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    url.to_string()
}

/// Filters out tracking parameters and sorts the remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0));
    params
}

/// Resolves a possibly relative link against the page it was found on
///
/// Returns `None` for empty links and non-navigable schemes.
pub fn resolve_link(href: &str, base: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("data:")
    {
        return None;
    }

    if let Ok(absolute) = Url::parse(href) {
        return Some(absolute.to_string());
    }

    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|u| u.to_string())
        .ok()
}
