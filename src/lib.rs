//! Review-Harvest: a resumable listing and review harvester
//!
//! This crate implements an extraction engine that walks a listing of records,
//! collects their paginated reviews through a rendering client, waits out
//! bot-interdiction challenges, and checkpoints progress so a restarted run
//! never repeats finished work.

pub mod catalog;
pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod render;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Review-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Render error: {0}")]
    Render(#[from] render::RenderError),
}

impl HarvestError {
    /// Returns true if the error means the rendering session cannot be used at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Render(e) if e.is_session_unavailable())
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// Result type alias for Review-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use catalog::{Catalog, Item, MergePolicy, Record, ResumeCursor};
pub use config::{Config, RunOptions, Target};
pub use crawler::{HarvestReport, Orchestrator};
pub use state::ViewState;
pub use url::{canonical_url, record_identity};
