//! Detail page preparation and review view planning

use crate::config::SessionConfig;
use crate::render::RenderClient;
use crate::state::{SessionLimits, ViewKind};
use std::collections::BTreeMap;

const PAGE_HEIGHT_SCRIPT: &str = "return document.body.scrollHeight";

/// Which review views a run asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewSelection {
    pub media_only: bool,
    pub all_star_types: bool,
}

/// One review view to collect, with its item cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedView {
    pub kind: ViewKind,
    pub cap: usize,
}

/// Decides which views to visit, in order, and how many items each may add
///
/// The media view comes first when requested, then one view per star
/// filter with a non-zero count in page order. The unfiltered view is used
/// only when neither of those was requested. Views with a cap of zero are
/// left out.
///
/// # Arguments
///
/// * `selection` - Requested views
/// * `limits` - Session caps
/// * `star_order` - Star keys in the order the page lists them
/// * `detailed` - Counts per filter key
/// * `total` - Sum of the star counts
pub fn plan_views(
    selection: ViewSelection,
    limits: &SessionLimits,
    star_order: &[String],
    detailed: &BTreeMap<String, u64>,
    total: u64,
) -> Vec<PlannedView> {
    let count = |key: &str| detailed.get(key).copied().unwrap_or(0) as usize;
    let mut views = Vec::new();

    if selection.media_only {
        let cap = count("media").min(limits.review_limit);
        if cap > 0 {
            views.push(PlannedView {
                kind: ViewKind::Media,
                cap,
            });
        } else {
            tracing::info!("No media reviews reported, skipping the media view");
        }
    }

    if selection.all_star_types {
        for key in star_order {
            let Some(kind @ ViewKind::Star(_)) = ViewKind::from_key(key) else {
                continue;
            };
            let cap = count(key).min(limits.star_limit_per_type);
            if cap > 0 {
                views.push(PlannedView { kind, cap });
            } else {
                tracing::debug!("No reviews reported for {}", kind);
            }
        }
    }

    if !selection.media_only && !selection.all_star_types {
        let available = detailed.get("all").copied().unwrap_or(total) as usize;
        let cap = available.min(limits.review_limit);
        if cap > 0 {
            views.push(PlannedView {
                kind: ViewKind::General,
                cap,
            });
        }
    }

    views
}

/// Scrolls down in steps so that lazily rendered sections appear
///
/// Each step goes a growing fraction further down the page. Clients that
/// cannot report a height are scrolled against the configured fallback.
pub async fn scroll_for_content(client: &mut dyn RenderClient, session: &SessionConfig) {
    let height = match client.execute_script(PAGE_HEIGHT_SCRIPT).await {
        Ok(Some(value)) => value.as_f64().unwrap_or(session.fallback_page_height as f64),
        Ok(None) => session.fallback_page_height as f64,
        Err(e) => {
            tracing::debug!("Page height unavailable: {}", e);
            session.fallback_page_height as f64
        }
    };

    let mut position = 0i64;
    for step in 0..session.scroll_attempts {
        let target = (height * session.scroll_fraction * f64::from(step + 1)) as i64;
        if let Err(e) = client.scroll_by(target - position).await {
            tracing::debug!("Scrolling stopped: {}", e);
            return;
        }
        position = target;
        tokio::time::sleep(session.scroll_pause()).await;
    }
}
