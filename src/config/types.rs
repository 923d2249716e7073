use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Review-Harvest
///
/// Every section is optional; a missing section or key takes the value of
/// the corresponding `Default` implementation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub session: SessionConfig,
    pub limits: LimitsConfig,
    pub interdiction: InterdictionConfig,
    pub vocabulary: VocabularyConfig,
    pub output: OutputConfig,
    pub site: SiteConfig,
}

/// Timing of the rendering session
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pause after every navigation before the location is inspected (milliseconds)
    #[serde(rename = "settle-ms")]
    pub settle_ms: u64,

    /// Pause after clicking a page or filter control (milliseconds)
    #[serde(rename = "click-settle-ms")]
    pub click_settle_ms: u64,

    /// Pause after a challenge was reported resolved (milliseconds)
    #[serde(rename = "challenge-pause-ms")]
    pub challenge_pause_ms: u64,

    /// Maximum wait for the first review to render (milliseconds)
    #[serde(rename = "content-timeout-ms")]
    pub content_timeout_ms: u64,

    /// Maximum wait for the rating filters to render (milliseconds)
    #[serde(rename = "filter-timeout-ms")]
    pub filter_timeout_ms: u64,

    /// Interval between presence checks while waiting (milliseconds)
    #[serde(rename = "poll-interval-ms")]
    pub poll_interval_ms: u64,

    /// Number of incremental scrolls used to trigger lazy content
    #[serde(rename = "scroll-attempts")]
    pub scroll_attempts: u32,

    /// Fraction of the page height added on each scroll step
    #[serde(rename = "scroll-fraction")]
    pub scroll_fraction: f64,

    /// Pause between scroll steps (milliseconds)
    #[serde(rename = "scroll-pause-ms")]
    pub scroll_pause_ms: u64,

    /// Page height assumed when the client cannot report one
    #[serde(rename = "fallback-page-height")]
    pub fallback_page_height: u64,
}

impl SessionConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn click_settle(&self) -> Duration {
        Duration::from_millis(self.click_settle_ms)
    }

    pub fn challenge_pause(&self) -> Duration {
        Duration::from_millis(self.challenge_pause_ms)
    }

    pub fn content_timeout(&self) -> Duration {
        Duration::from_millis(self.content_timeout_ms)
    }

    pub fn filter_timeout(&self) -> Duration {
        Duration::from_millis(self.filter_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    /// A configuration with every pause set to zero, for scripted sessions
    pub fn immediate() -> Self {
        Self {
            settle_ms: 0,
            click_settle_ms: 0,
            challenge_pause_ms: 0,
            content_timeout_ms: 0,
            filter_timeout_ms: 0,
            poll_interval_ms: 1,
            scroll_pause_ms: 0,
            ..Self::default()
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            settle_ms: 3000,
            click_settle_ms: 2000,
            challenge_pause_ms: 5000,
            content_timeout_ms: 15000,
            filter_timeout_ms: 15000,
            poll_interval_ms: 250,
            scroll_attempts: 4,
            scroll_fraction: 0.2,
            scroll_pause_ms: 500,
            fallback_page_height: 4000,
        }
    }
}

/// Target counts for a run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of listing entries taken from the search page
    #[serde(rename = "max-records")]
    pub max_records: usize,

    /// Maximum reviews per record (general and media views)
    #[serde(rename = "review-limit")]
    pub review_limit: usize,

    /// Maximum reviews per star filter
    #[serde(rename = "star-limit-per-type")]
    pub star_limit_per_type: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_records: 10,
            review_limit: 10,
            star_limit_per_type: 10,
        }
    }
}

/// Challenge detection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterdictionConfig {
    /// Substrings of the current location that mark a challenge page
    pub denylist: Vec<String>,
}

impl Default for InterdictionConfig {
    fn default() -> Self {
        Self {
            denylist: ["login", "captcha", "verify", "security", "check", "auth", "error"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Label synonyms used to normalize rating filters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// Labels of the unfiltered view
    pub all: Vec<String>,

    /// Labels of the "with comments" view
    pub commented: Vec<String>,

    /// Labels of the "with images or videos" view
    pub media: Vec<String>,

    /// Suffixes that multiply a count by one thousand
    #[serde(rename = "magnitude-suffixes")]
    pub magnitude_suffixes: Vec<String>,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            all: strings(&["all", "tudo", "tất cả"]),
            commented: strings(&["comments", "comentários", "có bình luận"]),
            media: strings(&["media", "mídia", "có hình ảnh / video"]),
            magnitude_suffixes: strings(&["mil", "k"]),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the checkpoint files are written to
    pub directory: String,

    /// Prefix of derived checkpoint file names
    #[serde(rename = "file-prefix")]
    pub file_prefix: String,

    /// Path of the cookie jar file
    #[serde(rename = "cookies-path")]
    pub cookies_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            file_prefix: "harvest".to_string(),
            cookies_path: "cookies.json".to_string(),
        }
    }
}

/// How a located element becomes a field value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldKind {
    /// Trimmed text with line breaks folded into spaces
    #[default]
    Text,

    /// Shortened number ("1,2k") converted to an integer
    Number,

    /// Link resolved against the current location
    Link,
}

/// Extraction rule for one named record field
#[derive(Debug, Clone, Deserialize)]
pub struct FieldRule {
    /// Field name in the record
    pub name: String,

    /// CSS selectors tried in order; the first non-empty value wins
    pub selectors: Vec<String>,

    /// Attribute to read instead of the element text
    #[serde(default)]
    pub attribute: Option<String>,

    #[serde(default)]
    pub kind: FieldKind,

    /// Replace a value that is already present (detail rules only)
    #[serde(default)]
    pub overwrite: bool,
}

impl FieldRule {
    fn new(name: &str, selectors: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            selectors: strings(selectors),
            attribute: None,
            kind: FieldKind::Text,
            overwrite: false,
        }
    }

    fn attribute(mut self, attribute: &str) -> Self {
        self.attribute = Some(attribute.to_string());
        self
    }

    fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    fn overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }
}

/// Selectors for the parts of a review
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewSelectors {
    pub author: String,

    /// Attribute of the author element holding the profile link
    #[serde(rename = "author-profile-attribute")]
    pub author_profile_attribute: String,

    /// Highlighted stars; the rating is their count
    #[serde(rename = "active-star")]
    pub active_star: String,

    pub time: String,

    /// Candidates for the review text, tried in order
    pub content: Vec<String>,

    #[serde(rename = "seller-respond")]
    pub seller_respond: String,

    #[serde(rename = "like-count")]
    pub like_count: String,

    pub image: String,
    pub video: String,
}

impl Default for ReviewSelectors {
    fn default() -> Self {
        Self {
            author: ".shopee-product-rating__author-name".to_string(),
            author_profile_attribute: "href".to_string(),
            active_star: ".shopee-product-rating__rating .icon-rating-solid--active".to_string(),
            time: ".shopee-product-rating__time".to_string(),
            content: strings(&[
                "div[style*=\"position: relative\"]",
                "div[style*=\"margin-top: 0.75rem\"]",
                ".shopee-product-rating__content",
            ]),
            seller_respond: "div.TQTPT9 div.qiTixQ".to_string(),
            like_count: ".shopee-product-rating__like-count".to_string(),
            image: "img".to_string(),
            video: "video".to_string(),
        }
    }
}

/// Site layout: the selector map consumed by the field extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// One element per listing entry on the search page
    #[serde(rename = "listing-item")]
    pub listing_item: String,

    /// Link inside a listing entry (its `href` is the record link)
    #[serde(rename = "listing-link")]
    pub listing_link: String,

    #[serde(rename = "listing-fields")]
    pub listing_fields: Vec<FieldRule>,

    /// Element that must exist for detail fields to be read
    #[serde(rename = "detail-scope")]
    pub detail_scope: Option<String>,

    #[serde(rename = "detail-fields")]
    pub detail_fields: Vec<FieldRule>,

    /// One element per rendered review
    #[serde(rename = "review-item")]
    pub review_item: String,

    /// One element per rating filter in the overview
    #[serde(rename = "rating-filter")]
    pub rating_filter: String,

    /// Numbered page controls below the review list
    #[serde(rename = "page-button")]
    pub page_button: String,

    pub review: ReviewSelectors,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_item: "ul.shopee-search-item-result__items > li".to_string(),
            listing_link: "a.contents".to_string(),
            listing_fields: vec![
                FieldRule::new("name", &["div.line-clamp-2"]),
                FieldRule::new("price", &["div.truncate.flex.items-baseline"]),
                FieldRule::new("rating", &["div.text-shopee-black87"]),
                FieldRule::new("location", &["div.text-shopee-black54"]),
                FieldRule::new("img", &["img.object-contain"]).attribute("src"),
            ],
            detail_scope: Some("div[role*=\"main\"]".to_string()),
            detail_fields: vec![
                FieldRule::new("description", &["section.product-detail__description div"]).overwrite(),
                FieldRule::new("category", &["section.product-detail__category div"]).overwrite(),
                FieldRule::new("name", &["div[role*=\"main\"] h1"]),
                FieldRule::new("price", &["section[aria-live=\"polite\"] > div > div:first-child"]),
                FieldRule::new("rating", &["div.F9RHbS.dQEiAI.jMXp4d"]),
                FieldRule::new("Ratings", &["div.F9RHbS"]).kind(FieldKind::Number),
                FieldRule::new("sold", &["span.AcmPRb"]).kind(FieldKind::Number),
                FieldRule::new("shop_name", &["section.page-product__shop div.fV3TIn"]),
                FieldRule::new("shop_profile_url", &["section.page-product__shop a"])
                    .attribute("href")
                    .kind(FieldKind::Link),
            ],
            review_item: "div.shopee-product-rating__main".to_string(),
            rating_filter: ".product-rating-overview__filter".to_string(),
            page_button: ".product-ratings__page-controller button".to_string(),
            review: ReviewSelectors::default(),
        }
    }
}

/// The content source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Search page URL; `{query}` is replaced by the encoded query
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// User agent sent by the HTTP rendering client
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    pub selectors: SelectorConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            search_url: "https://shopee.com.br/search?keyword={query}&page=0&sortBy=sales"
                .to_string(),
            user_agent: concat!("review-harvest/", env!("CARGO_PKG_VERSION")).to_string(),
            selectors: SelectorConfig::default(),
        }
    }
}
