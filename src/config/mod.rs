//! Configuration module for Review-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and the per-run options assembled from configuration and the
//! command line.
//!
//! # Example
//!
//! ```no_run
//! use review_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Reviews per record: {}", config.limits.review_limit);
//! ```

mod options;
mod parser;
mod types;
mod validation;

// Re-export types
pub use options::{RunOptions, Target};
pub use types::{
    Config, FieldKind, FieldRule, InterdictionConfig, LimitsConfig, OutputConfig,
    ReviewSelectors, SelectorConfig, SessionConfig, SiteConfig, VocabularyConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
