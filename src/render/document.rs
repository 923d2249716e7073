//! Static HTML documents addressed by element handles
//!
//! The markup is kept as text and parsed on demand, so a document can be
//! held by a client that is shared across tasks. Elements are addressed by
//! their position in document order.

use super::{ElementHandle, Locator, RenderError, RenderResult};
use crate::url::resolve_link;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;

static ANY_ELEMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("*").expect("universal selector is valid"));

/// Attributes consulted, in order, when a static element is clicked
const CLICK_TARGET_ATTRIBUTES: &[&str] = &["href", "data-href"];

/// One loaded document
#[derive(Debug, Clone)]
pub struct StaticDocument {
    url: String,
    html: String,
    generation: u64,
}

impl StaticDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>, generation: u64) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            generation,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn parse_locator(locator: &Locator) -> RenderResult<Selector> {
        Selector::parse(locator.as_str())
            .map_err(|_| RenderError::InvalidLocator(locator.to_string()))
    }

    fn check(&self, handle: &ElementHandle) -> RenderResult<()> {
        if handle.generation() != self.generation {
            return Err(RenderError::StaleElement(*handle));
        }
        Ok(())
    }

    fn resolve<'a>(&self, html: &'a Html, handle: &ElementHandle) -> RenderResult<ElementRef<'a>> {
        self.check(handle)?;
        html.select(&ANY_ELEMENT)
            .nth(handle.ordinal())
            .ok_or(RenderError::StaleElement(*handle))
    }

    /// Finds every element matching the locator, inside `scope` if given
    pub fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> RenderResult<Vec<ElementHandle>> {
        let selector = Self::parse_locator(locator)?;
        let html = Html::parse_document(&self.html);

        let ordinals: HashMap<_, usize> = html
            .select(&ANY_ELEMENT)
            .enumerate()
            .map(|(i, el)| (el.id(), i))
            .collect();

        let matches: Vec<ElementRef<'_>> = match scope {
            Some(handle) => self.resolve(&html, handle)?.select(&selector).collect(),
            None => html.select(&selector).collect(),
        };

        Ok(matches
            .into_iter()
            .filter_map(|el| ordinals.get(&el.id()))
            .map(|&ordinal| ElementHandle::new(self.generation, ordinal))
            .collect())
    }

    /// Text content with whitespace runs collapsed to single spaces
    pub fn text(&self, handle: &ElementHandle) -> RenderResult<String> {
        let html = Html::parse_document(&self.html);
        let element = self.resolve(&html, handle)?;
        let joined: String = element.text().collect();
        Ok(joined.split_whitespace().collect::<Vec<_>>().join(" "))
    }

    pub fn attribute(&self, handle: &ElementHandle, name: &str) -> RenderResult<Option<String>> {
        let html = Html::parse_document(&self.html);
        let element = self.resolve(&html, handle)?;
        Ok(element.value().attr(name).map(|v| v.to_string()))
    }

    /// Absolute URL a click on the element leads to
    ///
    /// Static documents have no scripts, so a click is modeled as following
    /// the element's link attribute.
    pub fn click_target(&self, handle: &ElementHandle) -> RenderResult<String> {
        let html = Html::parse_document(&self.html);
        let element = self.resolve(&html, handle)?;
        CLICK_TARGET_ATTRIBUTES
            .iter()
            .filter_map(|name| element.value().attr(name))
            .find_map(|href| resolve_link(href, &self.url))
            .ok_or(RenderError::NotClickable(*handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <ul class="list">
            <li class="entry"><a href="/a">First
                 entry</a></li>
            <li class="entry"><a href="https://other.example/b">Second</a></li>
          </ul>
          <nav><button data-href="?page=2">2</button><button>next</button></nav>
        </body></html>
    "#;

    fn document() -> StaticDocument {
        StaticDocument::new("https://shop.example/p/1", PAGE, 3)
    }

    #[test]
    fn test_find_all_in_document_order() {
        let doc = document();
        let entries = doc.find_all(None, &Locator::css("li.entry")).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].ordinal() < entries[1].ordinal());
    }

    #[test]
    fn test_scoped_find() {
        let doc = document();
        let entries = doc.find_all(None, &Locator::css("li.entry")).unwrap();
        let links = doc.find_all(Some(&entries[1]), &Locator::css("a")).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(doc.text(&links[0]).unwrap(), "Second");
    }

    #[test]
    fn test_text_collapses_whitespace() {
        let doc = document();
        let links = doc.find_all(None, &Locator::css("a")).unwrap();
        assert_eq!(doc.text(&links[0]).unwrap(), "First entry");
    }

    #[test]
    fn test_attribute() {
        let doc = document();
        let links = doc.find_all(None, &Locator::css("a")).unwrap();
        assert_eq!(doc.attribute(&links[0], "href").unwrap(), Some("/a".to_string()));
        assert_eq!(doc.attribute(&links[0], "title").unwrap(), None);
    }

    #[test]
    fn test_click_target_resolves_data_href() {
        let doc = document();
        let buttons = doc.find_all(None, &Locator::css("nav button")).unwrap();
        assert_eq!(
            doc.click_target(&buttons[0]).unwrap(),
            "https://shop.example/p/1?page=2"
        );
        assert!(matches!(
            doc.click_target(&buttons[1]),
            Err(RenderError::NotClickable(_))
        ));
    }

    #[test]
    fn test_stale_handle() {
        let doc = document();
        let links = doc.find_all(None, &Locator::css("a")).unwrap();
        let newer = StaticDocument::new("https://shop.example/p/2", PAGE, 4);
        assert!(matches!(newer.text(&links[0]), Err(RenderError::StaleElement(_))));
    }

    #[test]
    fn test_invalid_locator() {
        let doc = document();
        assert!(matches!(
            doc.find_all(None, &Locator::css("li[")),
            Err(RenderError::InvalidLocator(_))
        ));
    }
}
