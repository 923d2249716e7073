use crate::config::types::{Config, FieldRule, SelectorConfig, SessionConfig};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_session_config(&config.session)?;
    validate_output_config(&config.output)?;
    validate_search_url(&config.site.search_url)?;
    validate_selectors(&config.site.selectors)?;
    validate_vocabulary(config)?;
    Ok(())
}

/// Validates session timings
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.poll_interval_ms == 0 {
        return Err(ConfigError::Validation(
            "poll-interval-ms must be >= 1".to_string(),
        ));
    }

    if !(config.scroll_fraction > 0.0 && config.scroll_fraction <= 1.0) {
        return Err(ConfigError::Validation(format!(
            "scroll-fraction must be in (0, 1], got {}",
            config.scroll_fraction
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &crate::config::types::OutputConfig) -> Result<(), ConfigError> {
    if config.file_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "file-prefix cannot be empty".to_string(),
        ));
    }

    if config.cookies_path.is_empty() {
        return Err(ConfigError::Validation(
            "cookies-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates the search URL pattern
fn validate_search_url(pattern: &str) -> Result<(), ConfigError> {
    if !pattern.contains("{query}") {
        return Err(ConfigError::Validation(format!(
            "search-url must contain a {{query}} placeholder, got '{}'",
            pattern
        )));
    }

    let sample = pattern.replace("{query}", "sample");
    Url::parse(&sample)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid search-url '{}': {}", pattern, e)))?;

    Ok(())
}

/// Validates that a single CSS selector parses
fn validate_selector(context: &str, css: &str) -> Result<(), ConfigError> {
    Selector::parse(css)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", context, css, e)))
}

fn validate_field_rules(context: &str, rules: &[FieldRule]) -> Result<(), ConfigError> {
    for rule in rules {
        if rule.name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} field rule has an empty name",
                context
            )));
        }

        if rule.name == "link" {
            return Err(ConfigError::Validation(format!(
                "{} field rule cannot overwrite the record link",
                context
            )));
        }

        if rule.selectors.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{} field '{}' must have at least one selector",
                context, rule.name
            )));
        }

        for css in &rule.selectors {
            validate_selector(&format!("{} field '{}'", context, rule.name), css)?;
        }
    }
    Ok(())
}

/// Validates every selector of the site layout
fn validate_selectors(selectors: &SelectorConfig) -> Result<(), ConfigError> {
    validate_selector("listing-item", &selectors.listing_item)?;
    validate_selector("listing-link", &selectors.listing_link)?;
    validate_selector("review-item", &selectors.review_item)?;
    validate_selector("rating-filter", &selectors.rating_filter)?;
    validate_selector("page-button", &selectors.page_button)?;

    if let Some(scope) = &selectors.detail_scope {
        validate_selector("detail-scope", scope)?;
    }

    validate_field_rules("listing", &selectors.listing_fields)?;
    validate_field_rules("detail", &selectors.detail_fields)?;

    let review = &selectors.review;
    validate_selector("review author", &review.author)?;
    validate_selector("review active-star", &review.active_star)?;
    validate_selector("review time", &review.time)?;
    validate_selector("review seller-respond", &review.seller_respond)?;
    validate_selector("review like-count", &review.like_count)?;
    validate_selector("review image", &review.image)?;
    validate_selector("review video", &review.video)?;
    for css in &review.content {
        validate_selector("review content", css)?;
    }

    Ok(())
}

fn validate_vocabulary(config: &Config) -> Result<(), ConfigError> {
    let vocabulary = &config.vocabulary;
    let all_labels = vocabulary
        .all
        .iter()
        .chain(&vocabulary.commented)
        .chain(&vocabulary.media)
        .chain(&vocabulary.magnitude_suffixes);

    for label in all_labels {
        if label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "vocabulary entries cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_search_url_requires_placeholder() {
        let mut config = Config::default();
        config.site.search_url = "https://example.com/search".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_search_url_must_parse() {
        let mut config = Config::default();
        config.site.search_url = "not a url {query}".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_selector() {
        let mut config = Config::default();
        config.site.selectors.review_item = "div[".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidSelector(_))));
    }

    #[test]
    fn test_field_rule_cannot_target_link() {
        let mut config = Config::default();
        config.site.selectors.detail_fields[0].name = "link".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_scroll_fraction_bounds() {
        let mut config = Config::default();
        config.session.scroll_fraction = 0.0;
        assert!(validate(&config).is_err());
        config.session.scroll_fraction = 1.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_vocabulary_entry() {
        let mut config = Config::default();
        config.vocabulary.media.push("  ".to_string());
        assert!(validate(&config).is_err());
    }
}
