//! Scripted in-memory rendering client
//!
//! Serves documents registered up front, keyed by exact URL. Pages can be
//! made to answer with a challenge location a given number of times, which
//! exercises interdiction handling without a network. Clones share the page
//! table and the navigation log, so a test can keep one clone for
//! inspection while the harvester owns another.

use super::{
    Cookie, ElementHandle, Locator, RenderClient, RenderError, RenderResult, StaticDocument,
};
use crate::url::{cookie_domain_matches, domain_of};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

const EMPTY_PAGE: &str = "<html><head></head><body></body></html>";

/// Location served while a challenge is pending
pub const DEFAULT_CHALLENGE_URL: &str = "https://challenge.invalid/verify/captcha";

#[derive(Debug, Default)]
struct MemoryState {
    pages: HashMap<String, String>,
    challenges: HashMap<String, u32>,
    challenge_url: String,
    navigations: Vec<String>,
    scrolled: i64,
    cookies: Vec<Cookie>,
    fail_open: bool,
}

/// Rendering client over scripted documents
#[derive(Debug, Clone)]
pub struct MemoryRenderClient {
    state: Arc<Mutex<MemoryState>>,
    document: Option<StaticDocument>,
    generation: u64,
    open: bool,
}

impl Default for MemoryRenderClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRenderClient {
    pub fn new() -> Self {
        let state = MemoryState {
            challenge_url: DEFAULT_CHALLENGE_URL.to_string(),
            ..MemoryState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            document: None,
            generation: 0,
            open: false,
        }
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a document for a URL
    pub fn with_page(self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.add_page(url, html);
        self
    }

    /// Registers or replaces a document, visible to every clone
    pub fn add_page(&self, url: impl Into<String>, html: impl Into<String>) {
        self.state().pages.insert(url.into(), html.into());
    }

    /// Makes the next `times` visits to `url` land on the challenge location
    pub fn with_challenge(self, url: impl Into<String>, times: u32) -> Self {
        self.state().challenges.insert(url.into(), times);
        self
    }

    /// Makes [`RenderClient::open`] fail
    pub fn failing_open(self) -> Self {
        self.state().fail_open = true;
        self
    }

    /// Every URL requested so far, in order
    pub fn navigations(&self) -> Vec<String> {
        self.state().navigations.clone()
    }

    /// Number of times a URL was requested
    pub fn visits(&self, url: &str) -> usize {
        self.state().navigations.iter().filter(|u| *u == url).count()
    }

    /// Total vertical scroll distance requested
    pub fn scrolled(&self) -> i64 {
        self.state().scrolled
    }

    /// Cookies currently held by the session
    pub fn cookie_snapshot(&self) -> Vec<Cookie> {
        self.state().cookies.clone()
    }

    fn ensure_open(&self) -> RenderResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(RenderError::SessionUnavailable("session was not opened".to_string()))
        }
    }

    fn document(&self) -> RenderResult<&StaticDocument> {
        self.document.as_ref().ok_or(RenderError::NoDocument)
    }

    fn load(&mut self, url: &str) -> RenderResult<()> {
        self.ensure_open()?;

        let (location, html) = {
            let mut state = self.state();
            state.navigations.push(url.to_string());

            let challenged = match state.challenges.get_mut(url) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    true
                }
                _ => false,
            };

            if challenged {
                let location = state.challenge_url.clone();
                (location, EMPTY_PAGE.to_string())
            } else {
                let html = state.pages.get(url).cloned().unwrap_or_else(|| {
                    tracing::debug!("No scripted page for {}", url);
                    EMPTY_PAGE.to_string()
                });
                (url.to_string(), html)
            }
        };

        self.generation += 1;
        self.document = Some(StaticDocument::new(location, html, self.generation));
        Ok(())
    }
}

#[async_trait]
impl RenderClient for MemoryRenderClient {
    async fn open(&mut self) -> RenderResult<()> {
        if self.state().fail_open {
            return Err(RenderError::SessionUnavailable(
                "scripted session refused to open".to_string(),
            ));
        }
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn navigate(&mut self, url: &str) -> RenderResult<()> {
        self.load(url)
    }

    async fn current_url(&self) -> RenderResult<String> {
        Ok(self.document()?.url().to_string())
    }

    async fn find_many(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> RenderResult<Vec<ElementHandle>> {
        self.document()?.find_all(scope, locator)
    }

    async fn click(&mut self, element: &ElementHandle) -> RenderResult<()> {
        let target = self.document()?.click_target(element)?;
        self.load(&target)
    }

    async fn text(&self, element: &ElementHandle) -> RenderResult<String> {
        self.document()?.text(element)
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> RenderResult<Option<String>> {
        self.document()?.attribute(element, name)
    }

    async fn scroll_by(&mut self, pixels: i64) -> RenderResult<()> {
        self.document()?;
        self.state().scrolled += pixels;
        Ok(())
    }

    async fn execute_script(&mut self, _script: &str) -> RenderResult<Option<Value>> {
        self.document()?;
        Ok(None)
    }

    async fn cookies(&self, url: &str) -> RenderResult<Vec<Cookie>> {
        let host = domain_of(url).unwrap_or_default();
        Ok(self
            .state()
            .cookies
            .iter()
            .filter(|c| c.domain.is_empty() || cookie_domain_matches(&c.domain, &host))
            .cloned()
            .collect())
    }

    async fn add_cookies(&mut self, _url: &str, cookies: &[Cookie]) -> RenderResult<()> {
        let mut state = self.state();
        for cookie in cookies {
            state
                .cookies
                .retain(|c| !(c.name == cookie.name && c.domain == cookie.domain));
            state.cookies.push(cookie.clone());
        }
        Ok(())
    }
}
