//! Integration tests for the harvester
//!
//! These tests drive the orchestrator end-to-end against the scripted
//! in-memory rendering client and check the checkpoint file it leaves.

use review_harvest::catalog::{Catalog, Item, Record, ResumeCursor};
use review_harvest::config::{Config, RunOptions, SessionConfig, Target};
use review_harvest::crawler::{AutoResolveSignal, HarvestReport, Orchestrator};
use review_harvest::extract::SelectorExtractor;
use review_harvest::render::{Cookie, CookieJar, MemoryRenderClient};
use review_harvest::storage::open_store;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const SEARCH: &str = "https://shop.example/search?keyword=widget";

/// Creates a configuration with every pause removed
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.session = SessionConfig::immediate();
    config.site.search_url = "https://shop.example/search?keyword={query}".to_string();
    config
}

fn listing_page(links: &[&str]) -> String {
    let entries: String = links
        .iter()
        .enumerate()
        .map(|(i, link)| {
            format!(
                r#"<li><a class="contents" href="{}"><div class="line-clamp-2">Widget {}</div></a></li>"#,
                link, i
            )
        })
        .collect();
    format!(
        r#"<html><body><ul class="shopee-search-item-result__items">{}</ul></body></html>"#,
        entries
    )
}

fn page_link(base: &str, page: u32) -> String {
    if page == 1 {
        base.to_string()
    } else {
        format!("{}?page={}", base, page)
    }
}

/// A detail page showing `items` reviews of page `page` out of `pages`
fn detail_page(base: &str, title: &str, filters: &[&str], page: u32, items: usize, pages: u32) -> String {
    let filters: String = filters
        .iter()
        .map(|f| format!(r#"<div class="product-rating-overview__filter">{}</div>"#, f))
        .collect();
    let reviews: String = (0..items)
        .map(|i| {
            format!(
                r#"<div class="shopee-product-rating__main">
                     <a class="shopee-product-rating__author-name" href="/buyer/{page}{i}">buyer{page}{i}</a>
                     <div class="shopee-product-rating__rating">
                       <span class="icon-rating-solid--active"></span><span class="icon-rating-solid--active"></span>
                     </div>
                     <div class="shopee-product-rating__time">2024-05-0{i}</div>
                     <div class="shopee-product-rating__content">p{page} r{i}</div>
                   </div>"#,
                page = page,
                i = i
            )
        })
        .collect();
    let buttons: String = (1..=pages)
        .map(|p| format!(r#"<button data-href="{}">{}</button>"#, page_link(base, p), p))
        .collect();

    format!(
        r#"<html><body>
             <div role="main"><h1>{title}</h1></div>
             {filters}
             {reviews}
             <div class="product-ratings__page-controller">{buttons}</div>
           </body></html>"#,
        title = title,
        filters = filters,
        reviews = reviews,
        buttons = buttons
    )
}

/// Registers a paginated product with `per_page` reviews on each page
fn add_product(client: &MemoryRenderClient, base: &str, filters: &[&str], per_page: &[usize]) {
    let pages = per_page.len() as u32;
    for (i, items) in per_page.iter().enumerate() {
        let page = i as u32 + 1;
        client.add_page(
            page_link(base, page),
            detail_page(base, "Widget", filters, page, *items, pages),
        );
    }
}

async fn run(
    client: MemoryRenderClient,
    config: Config,
    options: RunOptions,
    checkpoint: &Path,
    cookies: Option<CookieJar>,
) -> review_harvest::Result<HarvestReport> {
    let extractor = SelectorExtractor::new(
        config.site.selectors.clone(),
        config.vocabulary.magnitude_suffixes.clone(),
    );
    let store = open_store(checkpoint).expect("Failed to open checkpoint");
    let orchestrator = Orchestrator::new(
        config,
        options,
        Box::new(client),
        Box::new(extractor),
        Box::new(AutoResolveSignal),
        Box::new(store),
        cookies,
    )?;
    orchestrator.execute().await
}

fn read_checkpoint(path: &Path) -> Catalog {
    let text = std::fs::read_to_string(path).expect("Checkpoint was not written");
    Catalog::load(&text)
}

fn checkpoint_in(dir: &TempDir) -> PathBuf {
    dir.path().join("out.json")
}

#[tokio::test]
async fn test_search_harvests_listed_records() {
    let dir = TempDir::new().unwrap();
    let first = "https://shop.example/widget-one-i.10.1";
    let second = "https://shop.example/widget-two-i.10.2";
    let unlisted = "https://shop.example/widget-three-i.10.3";

    let client = MemoryRenderClient::new().with_page(SEARCH, listing_page(&[first, second, unlisted]));
    let filters = ["Tudo (3)", "5 Estrelas (2)", "2 Estrelas (1)"];
    add_product(&client, first, &filters, &[2, 1]);
    add_product(&client, second, &filters, &[3]);

    let config = create_test_config();
    let mut options = RunOptions::new(Target::query("widget"), &config);
    options.max_records = 2;
    options.review_limit = 5;

    let checkpoint = checkpoint_in(&dir);
    let report = run(client.clone(), config, options, &checkpoint, None)
        .await
        .unwrap();

    assert_eq!(report.records_processed, 2);
    assert_eq!(report.items_collected, 6);
    assert_eq!(report.records_saved, Some(2));
    assert_eq!(client.visits(unlisted), 0);

    let catalog = read_checkpoint(&checkpoint);
    assert_eq!(catalog.len(), 2);
    for record in catalog.records() {
        assert_eq!(record.comments.len(), 3);
        assert_eq!(record.total_rating, 3);
        assert_eq!(record.detailed_rating.get("all"), Some(&3));
        assert_eq!(record.last_review_page, None);
    }

    let one = catalog.get("10.1").unwrap();
    // Listing values are not overwritten by the detail page
    assert_eq!(one.field("name").and_then(|v| v.as_str()), Some("Widget 0"));
    assert_eq!(one.comments[0].content, "p1 r0");
    assert_eq!(one.comments[2].content, "p2 r0");
    assert_eq!(one.comments[0].rating, 2);
    assert_eq!(one.comments[0].author, "buyer10");
    assert_eq!(one.comments[0].author_profile_url, "https://shop.example/buyer/10");
}

#[tokio::test]
async fn test_rerun_skips_completed_records() {
    let dir = TempDir::new().unwrap();
    let first = "https://shop.example/widget-one-i.10.1";
    let second = "https://shop.example/widget-two-i.10.2";

    let config = create_test_config();
    let mut options = RunOptions::new(Target::query("widget"), &config);
    options.max_records = 2;

    let checkpoint = checkpoint_in(&dir);
    let mut done = Record::new(first);
    done.comments.push(Item {
        content: "kept".to_string(),
        ..Item::default()
    });
    std::fs::write(&checkpoint, Catalog::from_records(vec![done]).to_json().unwrap()).unwrap();

    let client = MemoryRenderClient::new().with_page(SEARCH, listing_page(&[first, second]));
    add_product(&client, first, &["Tudo (1)"], &[1]);
    add_product(&client, second, &["Tudo (1)"], &[1]);

    let report = run(client.clone(), config, options, &checkpoint, None)
        .await
        .unwrap();

    assert_eq!(report.records_processed, 1);
    assert_eq!(client.visits(first), 0);
    assert_eq!(client.visits(second), 1);

    let catalog = read_checkpoint(&checkpoint);
    assert_eq!(catalog.get("10.1").unwrap().comments[0].content, "kept");
    assert_eq!(catalog.get("10.2").unwrap().comments.len(), 1);
}

#[tokio::test]
async fn test_continue_revisits_records_without_reviews_first() {
    let dir = TempDir::new().unwrap();
    let stale = "https://shop.example/old-widget-i.10.9";
    let empty = "https://shop.example/quiet-widget-i.10.8";
    let fresh = "https://shop.example/new-widget-i.10.7";

    let checkpoint = checkpoint_in(&dir);
    let saved = Catalog::from_records(vec![Record::new(stale), Record::new(empty)]);
    std::fs::write(&checkpoint, saved.to_json().unwrap()).unwrap();

    let client = MemoryRenderClient::new().with_page(SEARCH, listing_page(&[empty, fresh]));
    add_product(&client, stale, &["Tudo (2)"], &[2]);
    add_product(&client, empty, &["Tudo (0)"], &[0]);
    add_product(&client, fresh, &["Tudo (1)"], &[1]);

    let config = create_test_config();
    let target = Target::Query {
        query: "widget".to_string(),
        rescrape_missing: true,
    };
    let options = RunOptions::new(target, &config);
    let report = run(client.clone(), config, options, &checkpoint, None)
        .await
        .unwrap();

    assert_eq!(report.records_processed, 3);
    assert_eq!(client.visits(stale), 1);
    // Revisited once, not again after the listing merge
    assert_eq!(client.visits(empty), 1);
    assert_eq!(client.visits(fresh), 1);

    let catalog = read_checkpoint(&checkpoint);
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.get("10.9").unwrap().comments.len(), 2);
    assert_eq!(catalog.get("10.7").unwrap().comments.len(), 1);

    // The listing entry does not replace what the revisit read from the detail page
    let quiet = catalog.get("10.8").unwrap();
    assert_eq!(quiet.field("name").and_then(|v| v.as_str()), Some("Widget"));
    assert!(quiet.comments.is_empty());
}

#[tokio::test]
async fn test_refresh_harvests_completed_records_again() {
    let dir = TempDir::new().unwrap();
    let first = "https://shop.example/widget-one-i.10.1";

    let checkpoint = checkpoint_in(&dir);
    let mut done = Record::new(first);
    done.comments.push(Item {
        content: "stale".to_string(),
        ..Item::default()
    });
    std::fs::write(&checkpoint, Catalog::from_records(vec![done]).to_json().unwrap()).unwrap();

    let client = MemoryRenderClient::new().with_page(SEARCH, listing_page(&[first]));
    add_product(&client, first, &["Tudo (2)"], &[2]);

    let config = create_test_config();
    let mut options = RunOptions::new(Target::query("widget"), &config);
    options.refresh = true;
    let report = run(client.clone(), config, options, &checkpoint, None)
        .await
        .unwrap();

    assert_eq!(report.records_processed, 1);
    assert_eq!(client.visits(first), 1);

    let record = read_checkpoint(&checkpoint).get("10.1").cloned().unwrap();
    let contents: Vec<&str> = record.comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["p1 r0", "p1 r1"]);
}

#[tokio::test]
async fn test_continue_resumes_after_saved_page() {
    let dir = TempDir::new().unwrap();
    let link = "https://shop.example/gadget-i.20.5";
    let checkpoint = checkpoint_in(&dir);

    let mut saved = Record::new(link);
    saved.comments = (0..4)
        .map(|i| Item {
            content: format!("saved {}", i),
            ..Item::default()
        })
        .collect();
    saved.last_review_page = Some(ResumeCursor::new(2));
    std::fs::write(&checkpoint, Catalog::from_records(vec![saved]).to_json().unwrap()).unwrap();

    let client = MemoryRenderClient::new();
    add_product(&client, link, &["Tudo (8)", "5 Estrelas (8)"], &[2, 2, 2, 2]);

    let config = create_test_config();
    let options = RunOptions::new(
        Target::Record {
            url: link.to_string(),
            resume: true,
        },
        &config,
    );
    let report = run(client, config, options, &checkpoint, None)
        .await
        .unwrap();
    assert_eq!(report.items_collected, 4);

    let catalog = read_checkpoint(&checkpoint);
    let record = catalog.get("20.5").unwrap();
    let contents: Vec<&str> = record.comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(
        contents,
        vec!["saved 0", "saved 1", "saved 2", "saved 3", "p3 r0", "p3 r1", "p4 r0", "p4 r1"]
    );
    assert_eq!(record.last_review_page, Some(ResumeCursor::new(4)));
}

#[tokio::test]
async fn test_single_record_without_continue_records_cursor() {
    let dir = TempDir::new().unwrap();
    let link = "https://shop.example/gadget-i.20.6";
    let client = MemoryRenderClient::new();
    add_product(&client, link, &["Tudo (10)"], &[2, 2, 2]);

    let config = create_test_config();
    let mut options = RunOptions::new(Target::record(link), &config);
    options.review_limit = 5;

    let checkpoint = checkpoint_in(&dir);
    run(client, config, options, &checkpoint, None).await.unwrap();

    let record = read_checkpoint(&checkpoint).get("20.6").cloned().unwrap();
    assert_eq!(record.comments.len(), 5);
    // The third page was only partly collected
    assert_eq!(record.last_review_page, Some(ResumeCursor::new(2)));
}

#[tokio::test]
async fn test_star_views_respect_per_type_limit() {
    let dir = TempDir::new().unwrap();
    let link = "https://shop.example/gadget-i.30.1";
    let five = format!("{}?filter=5", link);
    let one = format!("{}?filter=1", link);

    let filters = [
        r#"<div class="product-rating-overview__filter">Tudo (7)</div>"#.to_string(),
        format!(r#"<div class="product-rating-overview__filter" data-href="{}">5 Estrelas (5)</div>"#, five),
        r#"<div class="product-rating-overview__filter">3 Estrelas (0)</div>"#.to_string(),
        format!(r#"<div class="product-rating-overview__filter" data-href="{}">1 Estrela (2)</div>"#, one),
    ]
    .concat();
    let review = |text: &str| {
        format!(
            r#"<div class="shopee-product-rating__main"><div class="shopee-product-rating__content">{}</div></div>"#,
            text
        )
    };
    let page = |reviews: String| {
        format!(
            r#"<html><body><div role="main"><h1>Gadget</h1></div>{}{}</body></html>"#,
            filters, reviews
        )
    };

    let client = MemoryRenderClient::new()
        .with_page(link, page(review("any")))
        .with_page(five.clone(), page((0..5).map(|i| review(&format!("five {}", i))).collect()))
        .with_page(one.clone(), page((0..2).map(|i| review(&format!("one {}", i))).collect()));

    let config = create_test_config();
    let mut options = RunOptions::new(Target::record(link), &config);
    options.all_star_types = true;
    options.star_limit_per_type = 3;

    let checkpoint = checkpoint_in(&dir);
    run(client.clone(), config, options, &checkpoint, None)
        .await
        .unwrap();

    let record = read_checkpoint(&checkpoint).get("30.1").cloned().unwrap();
    let contents: Vec<&str> = record.comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, vec!["five 0", "five 1", "five 2", "one 0", "one 1"]);
    assert_eq!(record.total_rating, 7);
    assert_eq!(client.visits(&five), 1);
}

#[tokio::test]
async fn test_challenge_is_waited_out() {
    let dir = TempDir::new().unwrap();
    let link = "https://shop.example/gadget-i.40.1";
    let client = MemoryRenderClient::new().with_challenge(link, 1);
    add_product(&client, link, &["Tudo (2)"], &[2]);

    let config = create_test_config();
    let options = RunOptions::new(Target::record(link), &config);
    let checkpoint = checkpoint_in(&dir);
    let report = run(client.clone(), config, options, &checkpoint, None)
        .await
        .unwrap();

    assert_eq!(report.interdictions, 1);
    assert_eq!(report.items_collected, 2);
    assert_eq!(client.visits(link), 2);
}

#[tokio::test]
async fn test_corrupt_checkpoint_is_replaced() {
    let dir = TempDir::new().unwrap();
    let link = "https://shop.example/gadget-i.50.1";
    let checkpoint = checkpoint_in(&dir);
    std::fs::write(&checkpoint, "[{\"link\": ").unwrap();

    let client = MemoryRenderClient::new();
    add_product(&client, link, &["Tudo (1)"], &[1]);

    let config = create_test_config();
    let options = RunOptions::new(Target::record(link), &config);
    run(client, config, options, &checkpoint, None).await.unwrap();

    let catalog = read_checkpoint(&checkpoint);
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.get("50.1").unwrap().comments.len(), 1);
}

#[tokio::test]
async fn test_index_only_skips_detail_pages() {
    let dir = TempDir::new().unwrap();
    let first = "https://shop.example/widget-one-i.10.1";
    let client = MemoryRenderClient::new().with_page(SEARCH, listing_page(&[first]));
    add_product(&client, first, &["Tudo (1)"], &[1]);

    let config = create_test_config();
    let mut options = RunOptions::new(Target::query("widget"), &config);
    options.index_only = true;

    let checkpoint = checkpoint_in(&dir);
    let report = run(client.clone(), config, options, &checkpoint, None)
        .await
        .unwrap();

    assert_eq!(report.records_processed, 0);
    assert_eq!(client.visits(first), 0);
    let catalog = read_checkpoint(&checkpoint);
    assert!(!catalog.get("10.1").unwrap().has_items());
}

#[tokio::test]
async fn test_failed_session_still_saves_checkpoint() {
    let dir = TempDir::new().unwrap();
    let checkpoint = checkpoint_in(&dir);
    let kept = Record::new("https://shop.example/widget-one-i.10.1");
    std::fs::write(&checkpoint, Catalog::from_records(vec![kept]).to_json().unwrap()).unwrap();

    let config = create_test_config();
    let options = RunOptions::new(Target::query("widget"), &config);
    let err = run(
        MemoryRenderClient::new().failing_open(),
        config,
        options,
        &checkpoint,
        None,
    )
    .await
    .unwrap_err();

    assert!(err.is_fatal());
    assert_eq!(read_checkpoint(&checkpoint).len(), 1);
}

#[tokio::test]
async fn test_cookies_persist_between_sessions() {
    let dir = TempDir::new().unwrap();
    let jar_path = dir.path().join("cookies.json");
    let jar = CookieJar::for_site(&jar_path, SEARCH).unwrap();
    jar.save(&[Cookie::new("SPC_F", "abc", "shop.example")]).unwrap();

    let client = MemoryRenderClient::new().with_page(SEARCH, listing_page(&[]));
    let config = create_test_config();
    let options = RunOptions::new(Target::query("widget"), &config);
    run(client.clone(), config, options, &checkpoint_in(&dir), Some(jar.clone()))
        .await
        .unwrap();

    let installed = client.cookie_snapshot();
    assert_eq!(installed.len(), 1);
    assert_eq!(installed[0].value, "abc");

    let saved = jar.load();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].name, "SPC_F");
}
