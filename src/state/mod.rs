//! State module for tracking harvest progress
//!
//! This module provides state management for review views and for the
//! session as a whole.
//!
//! # Components
//!
//! - `ViewState`: Tracks one paginated view (seeking, collecting, exhausted)
//! - `ViewKind`: Identifies which filtered view is being collected
//! - `SessionState`: Tracks limits, the resume cursor and interdictions met

mod session_state;
mod view_state;

// Re-export main types
pub use session_state::{InterdictionEvent, SessionLimits, SessionState};
pub use view_state::{ViewKind, ViewState};
