//! Selector-map field extractor

use super::FieldExtractor;
use crate::catalog::{Item, Record};
use crate::config::{FieldKind, FieldRule, SelectorConfig};
use crate::crawler::shortened_number_to_int;
use crate::render::{ElementHandle, Locator, RenderClient};
use crate::url::resolve_link;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Field extractor driven by CSS selectors from configuration
#[derive(Debug)]
pub struct SelectorExtractor {
    selectors: SelectorConfig,
    magnitude_suffixes: Vec<String>,

    /// Index of the review content selector that matched last
    content_hint: AtomicUsize,
}

impl SelectorExtractor {
    pub fn new(selectors: SelectorConfig, magnitude_suffixes: Vec<String>) -> Self {
        Self {
            selectors,
            magnitude_suffixes,
            content_hint: AtomicUsize::new(0),
        }
    }

    /// Reads an element's text, treating every failure as absent
    async fn text_of(client: &dyn RenderClient, element: &ElementHandle) -> Option<String> {
        match client.text(element).await {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Could not read text: {}", e);
                None
            }
        }
    }

    async fn attribute_of(
        client: &dyn RenderClient,
        element: &ElementHandle,
        name: &str,
    ) -> Option<String> {
        match client.attribute(element, name).await {
            Ok(Some(value)) if !value.trim().is_empty() => Some(value.trim().to_string()),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("Could not read attribute '{}': {}", name, e);
                None
            }
        }
    }

    async fn find(
        client: &dyn RenderClient,
        scope: Option<&ElementHandle>,
        css: &str,
    ) -> Option<ElementHandle> {
        match client.find_one(scope, &Locator::css(css)).await {
            Ok(found) => found,
            Err(e) => {
                tracing::debug!("Lookup of '{}' failed: {}", css, e);
                None
            }
        }
    }

    async fn find_all(
        client: &dyn RenderClient,
        scope: Option<&ElementHandle>,
        css: &str,
    ) -> Vec<ElementHandle> {
        client
            .find_many(scope, &Locator::css(css))
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("Lookup of '{}' failed: {}", css, e);
                Vec::new()
            })
    }

    async fn text_at(
        client: &dyn RenderClient,
        scope: Option<&ElementHandle>,
        css: &str,
    ) -> Option<String> {
        let element = Self::find(client, scope, css).await?;
        Self::text_of(client, &element).await
    }

    async fn base_url(client: &dyn RenderClient) -> String {
        client.current_url().await.unwrap_or_default()
    }

    /// Applies one field rule; the first selector yielding a value wins
    async fn apply_rule(
        &self,
        client: &dyn RenderClient,
        scope: Option<&ElementHandle>,
        rule: &FieldRule,
        base: &str,
    ) -> Option<Value> {
        for css in &rule.selectors {
            let Some(element) = Self::find(client, scope, css).await else {
                continue;
            };

            let raw = match &rule.attribute {
                Some(name) => Self::attribute_of(client, &element, name).await,
                None => Self::text_of(client, &element).await,
            };
            let Some(raw) = raw else {
                continue;
            };

            let value = match rule.kind {
                FieldKind::Text => Value::from(raw),
                FieldKind::Number => {
                    Value::from(shortened_number_to_int(&raw, &self.magnitude_suffixes))
                }
                FieldKind::Link => match resolve_link(&raw, base) {
                    Some(link) => Value::from(link),
                    None => continue,
                },
            };
            return Some(value);
        }

        tracing::debug!("No value for field '{}'", rule.name);
        None
    }

    /// Review text, trying the last matching selector first
    async fn content(&self, client: &dyn RenderClient, item: &ElementHandle) -> String {
        let candidates = &self.selectors.review.content;
        if candidates.is_empty() {
            return String::new();
        }

        let hint = self.content_hint.load(Ordering::Relaxed).min(candidates.len() - 1);
        let order = std::iter::once(hint).chain((0..candidates.len()).filter(|&i| i != hint));

        for index in order {
            if let Some(text) = Self::text_at(client, Some(item), &candidates[index]).await {
                self.content_hint.store(index, Ordering::Relaxed);
                return text;
            }
        }
        String::new()
    }

    async fn media(
        client: &dyn RenderClient,
        item: &ElementHandle,
        css: &str,
        base: &str,
    ) -> Vec<String> {
        let mut urls = Vec::new();
        for element in Self::find_all(client, Some(item), css).await {
            if let Some(src) = Self::attribute_of(client, &element, "src").await {
                if let Some(url) = resolve_link(&src, base) {
                    urls.push(url);
                }
            }
        }
        urls
    }
}

#[async_trait]
impl FieldExtractor for SelectorExtractor {
    async fn listing(&self, client: &dyn RenderClient, max: usize) -> Vec<Record> {
        let base = Self::base_url(client).await;
        let entries = Self::find_all(client, None, &self.selectors.listing_item).await;
        if entries.is_empty() {
            tracing::warn!("No listing entries found on {}", base);
            return Vec::new();
        }
        tracing::debug!("Found {} listing entries", entries.len());

        let mut records = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            if records.len() >= max {
                tracing::info!("Reached maximum number of records ({})", max);
                break;
            }

            let link = match Self::find(client, Some(entry), &self.selectors.listing_link).await {
                Some(anchor) => Self::attribute_of(client, &anchor, "href")
                    .await
                    .and_then(|href| resolve_link(&href, &base)),
                None => None,
            };
            let Some(link) = link else {
                tracing::warn!("Listing entry {} has no link, skipping", index);
                continue;
            };

            let mut record = Record::new(link);
            for rule in &self.selectors.listing_fields {
                if let Some(value) = self.apply_rule(client, Some(entry), rule, &base).await {
                    record.set_field(rule.name.clone(), value);
                }
            }
            records.push(record);
        }

        tracing::info!("Extracted {} listing entries", records.len());
        records
    }

    async fn detail_fields(&self, client: &dyn RenderClient, record: &mut Record) {
        if let Some(scope) = &self.selectors.detail_scope {
            if Self::find(client, None, scope).await.is_none() {
                tracing::warn!("Could not find the main content element on the detail page");
                return;
            }
        }

        let base = Self::base_url(client).await;
        for rule in &self.selectors.detail_fields {
            if !rule.overwrite && record.field(&rule.name).is_some() {
                continue;
            }
            if let Some(value) = self.apply_rule(client, None, rule, &base).await {
                tracing::debug!("Extracted {}: {}", rule.name, value);
                record.set_field(rule.name.clone(), value);
            }
        }
    }

    async fn item(&self, client: &dyn RenderClient, element: &ElementHandle) -> Item {
        let review = &self.selectors.review;
        let base = Self::base_url(client).await;
        let mut item = Item::default();

        if let Some(author) = Self::find(client, Some(element), &review.author).await {
            item.author = Self::text_of(client, &author).await.unwrap_or_default();
            item.author_profile_url =
                Self::attribute_of(client, &author, &review.author_profile_attribute)
                    .await
                    .and_then(|href| resolve_link(&href, &base))
                    .unwrap_or_default();
        }

        let stars = Self::find_all(client, Some(element), &review.active_star).await;
        item.rating = Item::bounded_rating(stars.len());

        item.time = Self::text_at(client, Some(element), &review.time)
            .await
            .unwrap_or_default();
        item.content = self.content(client, element).await;
        item.seller_respond = Self::text_at(client, Some(element), &review.seller_respond)
            .await
            .unwrap_or_default();
        item.like_count = Self::text_at(client, Some(element), &review.like_count)
            .await
            .and_then(|text| text.trim().parse::<u64>().ok())
            .unwrap_or(0);

        item.images = Self::media(client, element, &review.image, &base).await;
        item.videos = Self::media(client, element, &review.video, &base).await;

        item
    }

    fn item_locator(&self) -> Locator {
        Locator::css(&self.selectors.review_item)
    }

    fn filter_locator(&self) -> Locator {
        Locator::css(&self.selectors.rating_filter)
    }

    fn page_button_locator(&self) -> Locator {
        Locator::css(&self.selectors.page_button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::render::MemoryRenderClient;
    use serde_json::json;

    const SEARCH: &str = r#"<html><body>
      <ul class="shopee-search-item-result__items">
        <li>
          <a class="contents" href="/widget-a-i.10.20">
            <div class="line-clamp-2">Widget A</div>
            <div class="truncate flex items-baseline">R$ 10,00</div>
            <img class="object-contain" src="https://cdn.shop.example/a.jpg">
          </a>
        </li>
        <li><div class="line-clamp-2">No link</div></li>
        <li><a class="contents" href="/widget-b-i.10.21"><div class="line-clamp-2">Widget B</div></a></li>
      </ul>
    </body></html>"#;

    const DETAIL: &str = r#"<html><body>
      <div role="main">
        <h1>Widget A full name</h1>
        <div class="F9RHbS">1,2k</div>
        <span class="AcmPRb">15k</span>
      </div>
      <section class="page-product__shop"><a href="/shop/10"><div class="fV3TIn">Widget Store</div></a></section>
      <div class="shopee-product-rating__main">
        <a class="shopee-product-rating__author-name" href="/user/ana">ana</a>
        <div class="shopee-product-rating__rating">
          <span class="icon-rating-solid--active"></span><span class="icon-rating-solid--active"></span>
          <span class="icon-rating-solid--active"></span><span class="icon-rating"></span>
        </div>
        <div class="shopee-product-rating__time">2024-01-02 10:00</div>
        <div style="position: relative; margin: 15px 0px">Great
          widget</div>
        <img src="/img/1.jpg"><video src="https://cdn.shop.example/v.mp4"></video>
        <div class="shopee-product-rating__like-count">7</div>
      </div>
      <div class="shopee-product-rating__main">
        <div class="shopee-product-rating__like-count">many</div>
      </div>
    </body></html>"#;

    fn extractor() -> SelectorExtractor {
        let config = Config::default();
        SelectorExtractor::new(config.site.selectors, config.vocabulary.magnitude_suffixes)
    }

    async fn client_on(url: &str, html: &str) -> MemoryRenderClient {
        let mut client = MemoryRenderClient::new().with_page(url, html);
        client.open().await.unwrap();
        client.navigate(url).await.unwrap();
        client
    }

    #[tokio::test]
    async fn test_listing_skips_entries_without_link() {
        let client = client_on("https://shop.example/search?keyword=widget", SEARCH).await;
        let records = extractor().listing(&client, 10).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].link(), "https://shop.example/widget-a-i.10.20");
        assert_eq!(records[0].field("name"), Some(&json!("Widget A")));
        assert_eq!(records[0].field("price"), Some(&json!("R$ 10,00")));
        assert_eq!(records[0].field("img"), Some(&json!("https://cdn.shop.example/a.jpg")));
        assert!(records[1].field("price").is_none());
    }

    #[tokio::test]
    async fn test_listing_respects_max() {
        let client = client_on("https://shop.example/search?keyword=widget", SEARCH).await;
        let records = extractor().listing(&client, 1).await;
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_detail_fields() {
        let client = client_on("https://shop.example/widget-a-i.10.20", DETAIL).await;
        let mut record = Record::new("https://shop.example/widget-a-i.10.20");
        record.set_field("name", "Widget A");

        extractor().detail_fields(&client, &mut record).await;

        assert_eq!(record.field("name"), Some(&json!("Widget A")));
        assert_eq!(record.field("Ratings"), Some(&json!(1200)));
        assert_eq!(record.field("sold"), Some(&json!(15000)));
        assert_eq!(record.field("shop_name"), Some(&json!("Widget Store")));
        assert_eq!(
            record.field("shop_profile_url"),
            Some(&json!("https://shop.example/shop/10"))
        );
        assert!(record.field("description").is_none());
    }

    #[tokio::test]
    async fn test_detail_fields_without_main_scope() {
        let client = client_on("https://shop.example/p", "<html><body><h1>x</h1></body></html>").await;
        let mut record = Record::new("https://shop.example/p");
        extractor().detail_fields(&client, &mut record).await;
        assert!(record.fields.is_empty());
    }

    #[tokio::test]
    async fn test_item_fields() {
        let client = client_on("https://shop.example/widget-a-i.10.20", DETAIL).await;
        let extractor = extractor();
        let items = client.find_many(None, &extractor.item_locator()).await.unwrap();
        assert_eq!(items.len(), 2);

        let item = extractor.item(&client, &items[0]).await;
        assert_eq!(item.author, "ana");
        assert_eq!(item.author_profile_url, "https://shop.example/user/ana");
        assert_eq!(item.rating, 3);
        assert_eq!(item.time, "2024-01-02 10:00");
        assert_eq!(item.content, "Great widget");
        assert_eq!(item.like_count, 7);
        assert_eq!(item.images, vec!["https://shop.example/img/1.jpg".to_string()]);
        assert_eq!(item.videos, vec!["https://cdn.shop.example/v.mp4".to_string()]);
        assert!(item.seller_respond.is_empty());
    }

    #[tokio::test]
    async fn test_item_defaults_when_parts_missing() {
        let client = client_on("https://shop.example/widget-a-i.10.20", DETAIL).await;
        let extractor = extractor();
        let items = client.find_many(None, &extractor.item_locator()).await.unwrap();

        let item = extractor.item(&client, &items[1]).await;
        assert_eq!(item, Item::default());
    }
}
