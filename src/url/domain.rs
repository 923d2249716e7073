use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL, lowercases it, and
/// drops a leading `www.` so that cookies saved while browsing
/// `www.example.com` are found again for `example.com`.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use review_harvest::url::extract_domain;
///
/// let url = Url::parse("https://www.Example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| {
        let host = h.to_lowercase();
        match host.strip_prefix("www.") {
            Some(bare) => bare.to_string(),
            None => host,
        }
    })
}

/// Extracts the domain from a URL string, returning `None` if it does not parse
pub fn domain_of(link: &str) -> Option<String> {
    Url::parse(link.trim()).ok().as_ref().and_then(extract_domain)
}

/// Returns true if a cookie domain attribute applies to the given host
///
/// A leading dot on the cookie domain is ignored, and subdomains match.
pub fn cookie_domain_matches(cookie_domain: &str, host: &str) -> bool {
    let cookie_domain = cookie_domain.trim_start_matches('.').to_lowercase();
    let host = host.to_lowercase();
    host == cookie_domain || host.ends_with(&format!(".{}", cookie_domain))
}
