//! Harvesting core
//!
//! This module contains the logic that turns a rendering session into
//! records and reviews:
//! - Challenge-aware navigation
//! - Rating filter parsing and activation
//! - Review view planning and paginated collection
//! - Overall session orchestration with checkpointing

mod collector;
mod coordinator;
mod detail;
mod filters;
mod guard;

pub use collector::{PageCollector, PageSink};
pub use coordinator::{HarvestReport, Orchestrator};
pub use detail::{plan_views, scroll_for_content, PlannedView, ViewSelection};
pub use filters::{
    extract_detailed_rating, normalize_label, shortened_number_to_int, FilterDescriptor,
    RatingFilters,
};
pub use guard::{
    AutoResolveSignal, ConsoleSignal, InterdictionGuard, NavigationOutcome, ResolutionSignal,
};
