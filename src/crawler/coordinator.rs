//! Harvest orchestration
//!
//! This module drives one harvesting session from start to finish:
//! - Loading the checkpoint and installing saved cookies
//! - Searching the catalog or opening a single record
//! - Detail extraction, rating filters and paginated review collection
//! - Flushing progress after every page and every record
//! - Saving cookies and the final checkpoint, even when the run fails

use crate::catalog::{Catalog, MergePolicy, Record};
use crate::config::{Config, RunOptions, Target};
use crate::crawler::collector::{PageCollector, PageSink};
use crate::crawler::detail::{plan_views, scroll_for_content, ViewSelection};
use crate::crawler::filters::{extract_detailed_rating, RatingFilters};
use crate::crawler::guard::{InterdictionGuard, NavigationOutcome, ResolutionSignal};
use crate::extract::FieldExtractor;
use crate::render::{CookieJar, RenderClient};
use crate::state::{SessionLimits, SessionState, ViewKind};
use crate::storage::{ActiveRecord, CheckpointStore};
use crate::url::record_identity;
use crate::Result;
use std::path::PathBuf;
use std::time::Instant;
use tracing::Instrument;

/// Summary of a finished session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarvestReport {
    /// Records whose detail page was visited
    pub records_processed: usize,
    /// Reviews appended during this session
    pub items_collected: usize,
    /// Challenge pages met
    pub interdictions: usize,
    /// Records in the final checkpoint; `None` if the final save failed
    pub records_saved: Option<usize>,
    /// Checkpoint location
    pub output: PathBuf,
}

/// Flushes progress after every completed review page
struct CheckpointSink<'a> {
    store: &'a dyn CheckpointStore,
    catalog: &'a Catalog,
    session: &'a mut SessionState,
    attach_cursor: bool,
}

impl PageSink for CheckpointSink<'_> {
    fn page_completed(&mut self, record: &Record, page: u32) {
        self.session.page_completed(page);
        let cursor = if self.attach_cursor {
            self.session.last_completed_page()
        } else {
            None
        };
        flush_logged(
            self.store,
            self.catalog,
            Some(ActiveRecord::new(record).with_cursor(cursor)),
        );
    }
}

/// Writes the checkpoint, logging instead of failing
fn flush_logged(
    store: &dyn CheckpointStore,
    catalog: &Catalog,
    active: Option<ActiveRecord<'_>>,
) -> Option<usize> {
    match store.flush(catalog, active) {
        Ok(count) => {
            tracing::debug!("Checkpoint saved: {} records", count);
            Some(count)
        }
        Err(e) => {
            tracing::error!(
                "Failed to save checkpoint {}: {}",
                store.location().display(),
                e
            );
            None
        }
    }
}

/// Runs one harvesting session
pub struct Orchestrator {
    config: Config,
    options: RunOptions,
    client: Box<dyn RenderClient>,
    extractor: Box<dyn FieldExtractor>,
    guard: InterdictionGuard,
    filters: RatingFilters,
    store: Box<dyn CheckpointStore>,
    cookies: Option<CookieJar>,
    catalog: Catalog,
    session: SessionState,
}

impl Orchestrator {
    /// Creates an orchestrator for one run
    ///
    /// # Arguments
    ///
    /// * `config` - Site layout, timings and vocabulary
    /// * `options` - What to harvest in this run
    /// * `client` - Rendering session, not yet opened
    /// * `extractor` - Field extractor for the site
    /// * `signal` - Consulted when a challenge page appears
    /// * `store` - Checkpoint backend
    /// * `cookies` - Cookie file to restore and save, if any
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to [`execute`](Self::execute)
    /// * `Err(HarvestError)` - The run options are inconsistent
    pub fn new(
        config: Config,
        options: RunOptions,
        client: Box<dyn RenderClient>,
        extractor: Box<dyn FieldExtractor>,
        signal: Box<dyn ResolutionSignal>,
        store: Box<dyn CheckpointStore>,
        cookies: Option<CookieJar>,
    ) -> Result<Self> {
        options.validate()?;

        let guard = InterdictionGuard::new(&config.interdiction, &config.session, signal);
        let filters = RatingFilters::new(config.vocabulary.clone(), &config.session);
        let session = SessionState::new(SessionLimits::from_options(&options));

        Ok(Self {
            config,
            options,
            client,
            extractor,
            guard,
            filters,
            store,
            cookies,
            catalog: Catalog::new(),
            session,
        })
    }

    /// Runs the session to completion
    ///
    /// Failures of individual records are logged and the run continues.
    /// Only an unusable rendering session ends the run early; cookies and
    /// the checkpoint are still saved before the error is returned.
    pub async fn execute(mut self) -> Result<HarvestReport> {
        let start = Instant::now();
        let outcome = self.run().await;

        if let Err(e) = &outcome {
            tracing::error!("Harvest aborted: {}", e);
        }
        let records_saved = self.finalize().await;
        outcome?;

        let report = HarvestReport {
            records_processed: self.session.records_processed(),
            items_collected: self.session.items_collected(),
            interdictions: self.session.interdictions().len(),
            records_saved,
            output: self.store.location().to_path_buf(),
        };
        tracing::info!(
            "Harvest completed: {} records, {} reviews in {:?}",
            report.records_processed,
            report.items_collected,
            start.elapsed()
        );
        Ok(report)
    }

    async fn run(&mut self) -> Result<()> {
        self.catalog = match self.store.load() {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!("Could not load checkpoint, starting empty: {}", e);
                Catalog::new()
            }
        };

        self.client.open().await?;
        self.install_cookies().await;

        match self.options.target.clone() {
            Target::Record { url, resume } => self.harvest_single(&url, resume).await,
            Target::Query {
                query,
                rescrape_missing,
            } => self.harvest_search(&query, rescrape_missing).await,
        }
    }

    /// URL whose domain the session cookies belong to
    fn site_url(&self) -> String {
        match &self.options.target {
            Target::Record { url, .. } => url.clone(),
            Target::Query { .. } => self.options.search_url(&self.config).unwrap_or_default(),
        }
    }

    async fn install_cookies(&mut self) {
        let Some(jar) = &self.cookies else {
            return;
        };
        let cookies = jar.load();
        if cookies.is_empty() {
            return;
        }

        let url = self.site_url();
        match self.client.add_cookies(&url, &cookies).await {
            Ok(()) => tracing::info!("Installed {} saved cookies", cookies.len()),
            Err(e) => tracing::warn!("Could not install saved cookies: {}", e),
        }
    }

    async fn harvest_single(&mut self, url: &str, resume: bool) -> Result<()> {
        let identity = record_identity(url);
        let record = match self.catalog.get(&identity) {
            Some(existing) => {
                tracing::info!(
                    "Continuing record {} with {} saved reviews",
                    identity,
                    existing.comments.len()
                );
                existing.clone()
            }
            None => Record::new(url),
        };

        if resume {
            match record.last_review_page {
                Some(cursor) => {
                    tracing::info!("Resuming after review {}", cursor);
                    self.session.seed_resume(cursor);
                }
                None => tracing::info!("No saved review page, starting from the first page"),
            }
        }

        self.harvest_in_span(record, true).await
    }

    async fn harvest_search(&mut self, query: &str, rescrape_missing: bool) -> Result<()> {
        let mut revisited = Vec::new();
        if rescrape_missing && !self.options.index_only {
            revisited = self.catalog.missing_items();
            if !revisited.is_empty() {
                tracing::info!("Revisiting {} saved records without reviews", revisited.len());
                self.harvest_pending(&revisited).await?;
            }
        }

        let pending = self.search(query, &revisited).await?;

        if self.options.index_only {
            flush_logged(self.store.as_ref(), &self.catalog, None);
            tracing::info!("Index-only run, {} records left for a later pass", pending.len());
            return Ok(());
        }

        self.harvest_pending(&pending).await
    }

    async fn harvest_pending(&mut self, identities: &[String]) -> Result<()> {
        let total = identities.len();
        for (n, identity) in identities.iter().enumerate() {
            let Some(record) = self.catalog.get(identity).cloned() else {
                continue;
            };
            tracing::info!("Record {}/{}: {}", n + 1, total, record.link());
            self.harvest_in_span(record, false).await?;
        }
        Ok(())
    }

    /// Reads the search listing and merges it into the catalog
    ///
    /// Entries in `visited` were already harvested this run and are left
    /// untouched. Returns the identities that still need detail work.
    async fn search(&mut self, query: &str, visited: &[String]) -> Result<Vec<String>> {
        let Some(url) = self.options.search_url(&self.config) else {
            return Ok(Vec::new());
        };
        tracing::info!("Searching for '{}': {}", query, url);

        let outcome = self
            .guard
            .safe_navigate(self.client.as_mut(), &url, &mut self.session)
            .await?;
        if let NavigationOutcome::Unreachable(reason) = outcome {
            tracing::warn!("Search page unavailable: {}", reason);
            return Ok(Vec::new());
        }

        let listing = self
            .extractor
            .listing(self.client.as_ref(), self.session.limits.max_records)
            .await;
        if listing.is_empty() {
            tracing::warn!("No listing entries found for '{}'", query);
            return Ok(Vec::new());
        }

        let listed = listing.len();
        let policy = if self.options.refresh {
            MergePolicy::Refresh
        } else {
            MergePolicy::KeepComplete
        };
        let pending = self.catalog.merge(
            listing
                .into_iter()
                .filter(|record| !visited.contains(&record.identity())),
            policy,
        );
        tracing::info!(
            "{} of {} listed records need reviews",
            pending.len(),
            listed
        );
        Ok(pending)
    }

    async fn harvest_in_span(&mut self, record: Record, attach_cursor: bool) -> Result<()> {
        let span = tracing::info_span!("record", id = %record.identity());
        self.harvest_record(record, attach_cursor)
            .instrument(span)
            .await
    }

    /// Harvests one record and stores it, whatever the outcome
    async fn harvest_record(&mut self, mut record: Record, attach_cursor: bool) -> Result<()> {
        let before = record.comments.len();
        let outcome = self.fetch_detail(&mut record, attach_cursor).await;

        if attach_cursor {
            if let Some(cursor) = self.session.last_completed_page() {
                record.last_review_page = Some(cursor);
            }
        }

        let added = record.comments.len().saturating_sub(before);
        self.session.record_processed(added);
        tracing::info!(
            "Saved {} new reviews ({} total) for {}",
            added,
            record.comments.len(),
            record.link()
        );

        self.catalog.upsert(record);
        flush_logged(self.store.as_ref(), &self.catalog, None);
        outcome
    }

    /// Visits a record's detail page and collects its reviews
    ///
    /// Only an unusable session is an error. Every other problem leaves
    /// the record with whatever was gathered so far.
    async fn fetch_detail(&mut self, record: &mut Record, attach_cursor: bool) -> Result<()> {
        let Self {
            config,
            options,
            client,
            extractor,
            guard,
            filters,
            store,
            catalog,
            session,
            ..
        } = self;

        session.reset_cursor();
        let outcome = guard
            .safe_navigate(client.as_mut(), record.link(), session)
            .await?;
        if let NavigationOutcome::Unreachable(reason) = outcome {
            tracing::warn!("Keeping {} without details: {}", record.link(), reason);
            return Ok(());
        }

        scroll_for_content(client.as_mut(), &config.session).await;
        extractor.detail_fields(&**client, record).await;

        let rendered = client
            .wait_for(
                &extractor.item_locator(),
                config.session.content_timeout(),
                config.session.poll_interval(),
            )
            .await
            .unwrap_or_else(|e| {
                tracing::debug!("Waiting for reviews failed: {}", e);
                false
            });
        if !rendered {
            tracing::warn!("No reviews rendered for {}", record.link());
            record.clear_rating();
            return Ok(());
        }

        let filter_locator = extractor.filter_locator();
        let descriptors = filters.parse(&**client, &filter_locator).await;
        let (detailed, total) = extract_detailed_rating(&descriptors);
        record.detailed_rating = detailed;
        record.total_rating = total;

        let star_order: Vec<String> = descriptors
            .iter()
            .filter(|f| f.is_star())
            .map(|f| f.key.clone())
            .collect();
        let selection = ViewSelection {
            media_only: options.media_only,
            all_star_types: options.all_star_types,
        };
        let plan = plan_views(
            selection,
            &session.limits,
            &star_order,
            &record.detailed_rating,
            record.total_rating,
        );
        if plan.is_empty() {
            tracing::info!("No reviews to collect for {}", record.link());
        }

        let collector = PageCollector::new(extractor.as_ref(), config.session.click_settle());
        for view in plan {
            if view.kind != ViewKind::General
                && !filters
                    .activate(client.as_mut(), &filter_locator, &view.kind.key())
                    .await
            {
                continue;
            }

            session.reset_cursor();
            let seed = session.take_resume_seed();
            let mut sink = CheckpointSink {
                store: store.as_ref(),
                catalog: &*catalog,
                session: &mut *session,
                attach_cursor,
            };
            let added = collector
                .collect(client.as_mut(), record, view.cap, seed, &mut sink)
                .await;
            tracing::info!("Collected {} reviews from the {} view", added, view.kind);
        }

        Ok(())
    }

    /// Saves cookies and writes the final checkpoint
    async fn finalize(&mut self) -> Option<usize> {
        if self.client.is_open() {
            if let Some(jar) = &self.cookies {
                match self.client.cookies(&self.site_url()).await {
                    Ok(cookies) if !cookies.is_empty() => match jar.save(&cookies) {
                        Ok(()) => tracing::info!(
                            "Saved {} cookies to {}",
                            cookies.len(),
                            jar.path().display()
                        ),
                        Err(e) => tracing::warn!("Could not save cookies: {}", e),
                    },
                    Ok(_) => tracing::debug!("No cookies to save"),
                    Err(e) => tracing::warn!("Could not read session cookies: {}", e),
                }
            }
        }

        let saved = flush_logged(self.store.as_ref(), &self.catalog, None);
        if let Some(count) = saved {
            tracing::info!(
                "Checkpoint {} holds {} records",
                self.store.location().display(),
                count
            );
        }
        saved
    }
}
