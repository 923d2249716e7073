//! HTTP rendering client
//!
//! This client loads documents with plain HTTP requests and evaluates
//! locators against the returned markup:
//! - Building the HTTP client with a user agent and a shared cookie store
//! - GET requests with redirect following, so the final location is visible
//!   to challenge detection
//! - Error classification for failed navigations
//!
//! Pages that build their content with scripts will look empty to this
//! client; every consumer already treats missing elements as absent data.

use super::{
    Cookie, ElementHandle, Locator, RenderClient, RenderError, RenderResult, StaticDocument,
};
use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::{redirect::Policy, Client};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - User agent header sent with every request
/// * `jar` - Cookie store shared with the rendering client
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(user_agent: &str, jar: Arc<Jar>) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .cookie_provider(jar)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rendering client over static HTTP documents
pub struct HttpRenderClient {
    user_agent: String,
    jar: Arc<Jar>,
    client: Option<Client>,
    document: Option<StaticDocument>,
    generation: u64,
}

impl HttpRenderClient {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            jar: Arc::new(Jar::default()),
            client: None,
            document: None,
            generation: 0,
        }
    }

    fn client(&self) -> RenderResult<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| RenderError::SessionUnavailable("session was not opened".to_string()))
    }

    fn document(&self) -> RenderResult<&StaticDocument> {
        self.document.as_ref().ok_or(RenderError::NoDocument)
    }

    /// Fetches a URL and installs the response as the current document
    async fn load(&mut self, url: &str) -> RenderResult<()> {
        let client = self.client()?.clone();

        let response = client.get(url).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "Request timeout".to_string()
            } else if e.is_connect() {
                "Connection refused".to_string()
            } else {
                e.to_string()
            };
            RenderError::Navigation {
                url: url.to_string(),
                message,
            }
        })?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            tracing::warn!("{} answered with status {}", final_url, status.as_u16());
        }

        let body = response.text().await.map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        self.generation += 1;
        self.document = Some(StaticDocument::new(final_url, body, self.generation));
        Ok(())
    }
}

#[async_trait]
impl RenderClient for HttpRenderClient {
    async fn open(&mut self) -> RenderResult<()> {
        let client = build_http_client(&self.user_agent, Arc::clone(&self.jar))
            .map_err(|e| RenderError::SessionUnavailable(e.to_string()))?;
        self.client = Some(client);
        tracing::info!("HTTP rendering session opened");
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&mut self, url: &str) -> RenderResult<()> {
        tracing::debug!("GET {}", url);
        self.load(url).await
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
        tracing::debug!("Following click target {}", target);
        self.load(&target).await
    }

    async fn text(&self, element: &ElementHandle) -> RenderResult<String> {
        self.document()?.text(element)
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> RenderResult<Option<String>> {
        self.document()?.attribute(element, name)
    }

    async fn scroll_by(&mut self, _pixels: i64) -> RenderResult<()> {
        // Static documents are fully loaded; there is nothing to reveal.
        self.document()?;
        Ok(())
    }

    async fn execute_script(&mut self, script: &str) -> RenderResult<Option<Value>> {
        tracing::debug!("Scripts are not evaluated by the HTTP client: {}", script);
        Ok(None)
    }

    async fn cookies(&self, url: &str) -> RenderResult<Vec<Cookie>> {
        let parsed = Url::parse(url).map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        let domain = parsed.host_str().unwrap_or_default().to_string();

        Ok(self
            .jar
            .cookies(&parsed)
            .and_then(|header| header.to_str().ok().map(|s| s.to_string()))
            .map(|header| Cookie::parse_header(&header, &domain))
            .unwrap_or_default())
    }

    async fn add_cookies(&mut self, url: &str, cookies: &[Cookie]) -> RenderResult<()> {
        let parsed = Url::parse(url).map_err(|e| RenderError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        for cookie in cookies {
            self.jar.add_cookie_str(&cookie.to_set_cookie(), &parsed);
        }
        Ok(())
    }
}
