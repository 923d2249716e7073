/// Review view state definitions
///
/// This module defines the states a paginated review view moves through while
/// it is collected, and the kinds of views a record can be collected from.
use std::fmt;

/// Represents the current state of one paginated view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewState {
    /// Clicking through page controls without collecting until `target` is shown
    Seeking { target: u32 },

    /// Collecting the items of the current page
    Collecting,

    /// Nothing more to collect: cap reached, empty page, or no further page
    Exhausted,
}

impl ViewState {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exhausted)
    }

    /// Short name of the state, used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Seeking { .. } => "seeking",
            Self::Collecting => "collecting",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seeking { target } => write!(f, "seeking page {}", target),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// A filtered or unfiltered review view of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    /// The unfiltered review list
    General,

    /// Reviews with images or videos
    Media,

    /// Reviews with a given star rating
    Star(u8),
}

impl ViewKind {
    /// The filter key of this view (`all`, `media`, `<n>_star`)
    pub fn key(&self) -> String {
        match self {
            Self::General => "all".to_string(),
            Self::Media => "media".to_string(),
            Self::Star(stars) => format!("{}_star", stars),
        }
    }

    /// Parses a filter key back into a view kind
    ///
    /// Returns None for keys that do not name a collectable view.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "all" => Some(Self::General),
            "media" => Some(Self::Media),
            _ => {
                let stars: u8 = key.strip_suffix("_star")?.parse().ok()?;
                (1..=5).contains(&stars).then_some(Self::Star(stars))
            }
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general reviews"),
            Self::Media => write!(f, "media reviews"),
            Self::Star(stars) => write!(f, "{}-star reviews", stars),
        }
    }
}
