//! Rendering client module for Review-Harvest
//!
//! The harvesting core never loads pages itself; it drives a [`RenderClient`]
//! that can navigate, locate elements, click them and read their text. Two
//! clients ship with the crate:
//!
//! - [`HttpRenderClient`] fetches static documents over HTTP
//! - [`MemoryRenderClient`] serves scripted documents from memory
//!
//! Session cookies are persisted between runs by the [`CookieJar`] service.

mod cookies;
mod document;
mod http;
mod memory;

pub use cookies::{Cookie, CookieJar};
pub use document::StaticDocument;
pub use http::HttpRenderClient;
pub use memory::MemoryRenderClient;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a rendering client
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Rendering session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Element {0} no longer belongs to the current document")]
    StaleElement(ElementHandle),

    #[error("No document is loaded")]
    NoDocument,

    #[error("Invalid locator '{0}'")]
    InvalidLocator(String),

    #[error("Element {0} cannot be clicked")]
    NotClickable(ElementHandle),
}

impl RenderError {
    /// Returns true if the session itself cannot be used
    pub fn is_session_unavailable(&self) -> bool {
        matches!(self, Self::SessionUnavailable(_))
    }
}

/// Result type alias for rendering operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

/// A CSS locator
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator(String);

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to an element of the current document
///
/// A handle is only valid for the document it was found in; using it after
/// a navigation or click yields [`RenderError::StaleElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    generation: u64,
    ordinal: usize,
}

impl ElementHandle {
    pub(crate) fn new(generation: u64, ordinal: usize) -> Self {
        Self {
            generation,
            ordinal,
        }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn ordinal(&self) -> usize {
        self.ordinal
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.ordinal, self.generation)
    }
}

/// Capability interface of a page rendering session
///
/// All methods take the session sequentially; the harvester never issues
/// two operations at once.
#[async_trait]
pub trait RenderClient: Send + Sync {
    /// Opens the session; must be called before any other operation
    async fn open(&mut self) -> RenderResult<()>;

    /// Returns true once [`open`](Self::open) succeeded
    fn is_open(&self) -> bool;

    /// Loads a URL, replacing the current document
    async fn navigate(&mut self, url: &str) -> RenderResult<()>;

    /// Location of the current document after redirects
    async fn current_url(&self) -> RenderResult<String>;

    /// Finds the first element matching a locator, inside `scope` if given
    async fn find_one(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> RenderResult<Option<ElementHandle>> {
        Ok(self.find_many(scope, locator).await?.into_iter().next())
    }

    /// Finds every element matching a locator, in document order
    async fn find_many(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> RenderResult<Vec<ElementHandle>>;

    /// Activates an element
    async fn click(&mut self, element: &ElementHandle) -> RenderResult<()>;

    /// Visible text of an element, whitespace collapsed
    async fn text(&self, element: &ElementHandle) -> RenderResult<String>;

    /// Attribute value of an element
    async fn attribute(&self, element: &ElementHandle, name: &str) -> RenderResult<Option<String>>;

    /// Scrolls the viewport vertically
    async fn scroll_by(&mut self, pixels: i64) -> RenderResult<()>;

    /// Runs a script in the page; `None` when the script produced no value
    async fn execute_script(&mut self, script: &str) -> RenderResult<Option<Value>>;

    /// Waits until an element matching the locator is present
    ///
    /// Returns `false` when the timeout elapses first. The presence check
    /// always runs at least once.
    async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll: Duration,
    ) -> RenderResult<bool> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.find_one(None, locator).await?.is_some() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// Cookies the session holds for a URL
    async fn cookies(&self, url: &str) -> RenderResult<Vec<Cookie>>;

    /// Installs cookies for a URL
    async fn add_cookies(&mut self, url: &str, cookies: &[Cookie]) -> RenderResult<()>;
}
