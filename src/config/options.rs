use crate::config::types::{Config, OutputConfig};
use crate::url::{checkpoint_name_for_link, checkpoint_name_for_query, search_url};
use crate::{ConfigError, ConfigResult};
use std::path::PathBuf;

/// What a run harvests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Enumerate the search listing for a query
    Query {
        query: String,

        /// Revisit persisted entries that have no reviews before searching
        rescrape_missing: bool,
    },

    /// Harvest one record by its link
    Record {
        url: String,

        /// Resume the review pages after the persisted cursor
        resume: bool,
    },
}

impl Target {
    pub fn query(query: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
            rescrape_missing: false,
        }
    }

    pub fn record(url: impl Into<String>) -> Self {
        Self::Record {
            url: url.into(),
            resume: false,
        }
    }
}

/// Parameters of one harvesting run
///
/// Built from the configuration limits and then overridden by the command
/// line. The orchestrator reads nothing else about the run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target: Target,
    pub max_records: usize,
    pub review_limit: usize,
    pub star_limit_per_type: usize,

    /// Collect only reviews behind the media filter
    pub media_only: bool,

    /// Collect reviews behind every star filter
    pub all_star_types: bool,

    /// Persist listing entries without visiting them
    pub index_only: bool,

    /// Re-fetch listed records even when they already have reviews
    pub refresh: bool,

    /// Explicit checkpoint path; derived from the target when absent
    pub output: Option<PathBuf>,
}

impl RunOptions {
    /// Creates options for a target using the configured limits
    pub fn new(target: Target, config: &Config) -> Self {
        Self {
            target,
            max_records: config.limits.max_records,
            review_limit: config.limits.review_limit,
            star_limit_per_type: config.limits.star_limit_per_type,
            media_only: false,
            all_star_types: false,
            index_only: false,
            refresh: false,
            output: None,
        }
    }

    /// Checks flag combinations that cannot be honored together
    pub fn validate(&self) -> ConfigResult<()> {
        if self.media_only && self.all_star_types {
            return Err(ConfigError::Validation(
                "media-only and all-star-types cannot be used together".to_string(),
            ));
        }

        if self.refresh && self.index_only {
            return Err(ConfigError::Validation(
                "refresh would drop saved reviews in an index-only run".to_string(),
            ));
        }

        match &self.target {
            Target::Query { query, .. } if query.trim().is_empty() => Err(
                ConfigError::Validation("search query cannot be empty".to_string()),
            ),
            Target::Record { url, .. } => url::Url::parse(url.trim())
                .map(|_| ())
                .map_err(|e| ConfigError::InvalidUrl(format!("Invalid record link '{}': {}", url, e))),
            _ => Ok(()),
        }
    }

    /// Path of the checkpoint file for this run
    pub fn checkpoint_path(&self, output: &OutputConfig) -> PathBuf {
        if let Some(path) = &self.output {
            return path.clone();
        }

        let name = match &self.target {
            Target::Query { query, .. } => checkpoint_name_for_query(&output.file_prefix, query),
            Target::Record { url, .. } => checkpoint_name_for_link(&output.file_prefix, url),
        };
        PathBuf::from(&output.directory).join(name)
    }

    /// Search page URL in catalog-search mode
    pub fn search_url(&self, config: &Config) -> Option<String> {
        match &self.target {
            Target::Query { query, .. } => Some(search_url(&config.site.search_url, query)),
            Target::Record { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_uses_configured_limits() {
        let mut config = Config::default();
        config.limits.review_limit = 42;
        let options = RunOptions::new(Target::query("widget"), &config);
        assert_eq!(options.review_limit, 42);
        assert_eq!(options.max_records, 10);
    }

    #[test]
    fn test_media_only_conflicts_with_all_star_types() {
        let mut options = RunOptions::new(Target::query("widget"), &Config::default());
        options.media_only = true;
        options.all_star_types = true;
        assert!(matches!(options.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_refresh_conflicts_with_index_only() {
        let mut options = RunOptions::new(Target::query("widget"), &Config::default());
        options.refresh = true;
        assert!(options.validate().is_ok());

        options.index_only = true;
        assert!(matches!(options.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_empty_query_is_rejected() {
        let options = RunOptions::new(Target::query("   "), &Config::default());
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_invalid_record_link_is_rejected() {
        let options = RunOptions::new(Target::record("not a link"), &Config::default());
        assert!(matches!(options.validate(), Err(ConfigError::InvalidUrl(_))));
    }

    #[test]
    fn test_checkpoint_path_derivation() {
        let mut config = Config::default();
        config.output.directory = "out".to_string();

        let search = RunOptions::new(Target::query("Widget"), &config);
        assert_eq!(search.checkpoint_path(&config.output), PathBuf::from("out/harvest_widget.json"));

        let single = RunOptions::new(Target::record("https://example.com/x-i.1.2"), &config);
        assert_eq!(single.checkpoint_path(&config.output), PathBuf::from("out/harvest_1_2.json"));
    }

    #[test]
    fn test_checkpoint_path_override() {
        let config = Config::default();
        let mut options = RunOptions::new(Target::query("widget"), &config);
        options.output = Some(PathBuf::from("/tmp/custom.json"));
        assert_eq!(options.checkpoint_path(&config.output), PathBuf::from("/tmp/custom.json"));
    }

    #[test]
    fn test_search_url_only_for_queries() {
        let config = Config::default();
        let search = RunOptions::new(Target::query("usb hub"), &config);
        assert!(search.search_url(&config).unwrap().contains("keyword=usb%20hub"));

        let single = RunOptions::new(Target::record("https://example.com/a"), &config);
        assert!(single.search_url(&config).is_none());
    }
}
