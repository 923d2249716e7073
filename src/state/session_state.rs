use crate::catalog::ResumeCursor;
use crate::config::RunOptions;
use chrono::{DateTime, Utc};

/// A challenge page met during navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterdictionEvent {
    /// URL that was requested
    pub url: String,

    /// Location the session was sent to instead
    pub location: String,

    /// Denylist entry that matched the location
    pub marker: String,

    pub detected_at: DateTime<Utc>,

    /// Whether the page was reachable after the challenge was resolved
    pub resolved: bool,
}

/// Target counts of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_records: usize,
    pub review_limit: usize,
    pub star_limit_per_type: usize,
}

impl SessionLimits {
    pub fn from_options(options: &RunOptions) -> Self {
        Self {
            max_records: options.max_records,
            review_limit: options.review_limit,
            star_limit_per_type: options.star_limit_per_type,
        }
    }
}

/// Tracks the state of one harvesting session
///
/// Nothing here is persisted directly; the resume cursor reaches the
/// checkpoint through the flush of the active record.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub limits: SessionLimits,

    /// Cursor loaded from the checkpoint, consumed by the first collection
    resume_seed: Option<ResumeCursor>,

    /// Last page completed in the current view
    last_completed_page: Option<ResumeCursor>,

    interdictions: Vec<InterdictionEvent>,

    records_processed: usize,
    items_collected: usize,
}

impl SessionState {
    /// Creates a new SessionState with no progress
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            limits,
            resume_seed: None,
            last_completed_page: None,
            interdictions: Vec::new(),
            records_processed: 0,
            items_collected: 0,
        }
    }

    /// Seeds the next collection with a persisted cursor
    pub fn seed_resume(&mut self, cursor: ResumeCursor) {
        self.resume_seed = Some(cursor);
    }

    /// Takes the resume seed; later calls in the same session return None
    pub fn take_resume_seed(&mut self) -> Option<ResumeCursor> {
        self.resume_seed.take()
    }

    /// Records that a page was fully collected
    pub fn page_completed(&mut self, page: u32) {
        self.last_completed_page = Some(ResumeCursor::new(page));
    }

    pub fn last_completed_page(&self) -> Option<ResumeCursor> {
        self.last_completed_page
    }

    /// Forgets the page cursor when a new view or record starts
    pub fn reset_cursor(&mut self) {
        self.last_completed_page = None;
    }

    pub fn record_interdiction(&mut self, event: InterdictionEvent) {
        self.interdictions.push(event);
    }

    pub fn interdictions(&self) -> &[InterdictionEvent] {
        &self.interdictions
    }

    pub fn record_processed(&mut self, items: usize) {
        self.records_processed += 1;
        self.items_collected += items;
    }

    pub fn records_processed(&self) -> usize {
        self.records_processed
    }

    pub fn items_collected(&self) -> usize {
        self.items_collected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> SessionLimits {
        SessionLimits {
            max_records: 2,
            review_limit: 5,
            star_limit_per_type: 3,
        }
    }

    #[test]
    fn test_resume_seed_is_consumed_once() {
        let mut state = SessionState::new(limits());
        state.seed_resume(ResumeCursor::new(2));

        assert_eq!(state.take_resume_seed(), Some(ResumeCursor::new(2)));
        assert_eq!(state.take_resume_seed(), None);
    }

    #[test]
    fn test_page_cursor() {
        let mut state = SessionState::new(limits());
        assert_eq!(state.last_completed_page(), None);

        state.page_completed(1);
        state.page_completed(2);
        assert_eq!(state.last_completed_page(), Some(ResumeCursor::new(2)));

        state.reset_cursor();
        assert_eq!(state.last_completed_page(), None);
    }

    #[test]
    fn test_counters() {
        let mut state = SessionState::new(limits());
        state.record_processed(3);
        state.record_processed(0);
        assert_eq!(state.records_processed(), 2);
        assert_eq!(state.items_collected(), 3);
    }
}
