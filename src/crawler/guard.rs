//! Challenge-aware navigation
//!
//! After every navigation the resulting location is checked against a
//! denylist of substrings. A hit means the site answered with a challenge
//! (login wall, captcha, security check); the guard hands control to a
//! [`ResolutionSignal`], waits, and retries the navigation once.

use crate::config::{InterdictionConfig, SessionConfig};
use crate::render::{RenderClient, RenderResult};
use crate::state::{InterdictionEvent, SessionState};
use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Tells the guard when a challenge has been dealt with
#[async_trait]
pub trait ResolutionSignal: Send + Sync {
    /// Returns once the challenge described by `event` may be retried
    async fn wait_for_resolution(&self, event: &InterdictionEvent);
}

/// Asks the operator on the terminal and waits for Enter
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSignal;

#[async_trait]
impl ResolutionSignal for ConsoleSignal {
    async fn wait_for_resolution(&self, event: &InterdictionEvent) {
        eprintln!(
            "Challenge page detected at {}. Resolve it in the session, then press Enter to continue...",
            event.location
        );

        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(0) => tracing::warn!("Standard input closed; continuing without confirmation"),
            Ok(_) => tracing::debug!("Operator confirmed challenge resolution"),
            Err(e) => tracing::warn!("Could not read confirmation: {}", e),
        }
    }
}

/// Returns immediately; for unattended runs and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoResolveSignal;

#[async_trait]
impl ResolutionSignal for AutoResolveSignal {
    async fn wait_for_resolution(&self, event: &InterdictionEvent) {
        tracing::debug!("Not waiting on challenge at {}", event.location);
    }
}

/// Result of a guarded navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The page loaded without a challenge
    Clear,
    /// A challenge was met and the retry reached the page
    Resolved,
    /// The retry still landed on a challenge
    StillChallenged,
    /// The page could not be loaded at all
    Unreachable(String),
}

/// Navigation wrapper that detects and waits out challenge pages
pub struct InterdictionGuard {
    denylist: Vec<String>,
    settle: Duration,
    challenge_pause: Duration,
    signal: Box<dyn ResolutionSignal>,
}

impl InterdictionGuard {
    pub fn new(
        interdiction: &InterdictionConfig,
        session: &SessionConfig,
        signal: Box<dyn ResolutionSignal>,
    ) -> Self {
        Self {
            denylist: interdiction
                .denylist
                .iter()
                .filter(|m| !m.is_empty())
                .map(|m| m.to_lowercase())
                .collect(),
            settle: session.settle(),
            challenge_pause: session.challenge_pause(),
            signal,
        }
    }

    /// Returns the denylist entry found in a location, if any
    pub fn detect(&self, location: &str) -> Option<&str> {
        let lower = location.to_lowercase();
        self.denylist
            .iter()
            .find(|marker| lower.contains(marker.as_str()))
            .map(|m| m.as_str())
    }

    /// Navigates to `url`, resolving at most one challenge
    ///
    /// # Returns
    ///
    /// * `Ok(NavigationOutcome)` - What the session ended up showing
    /// * `Err(RenderError)` - The session itself is unavailable
    pub async fn safe_navigate(
        &self,
        client: &mut dyn RenderClient,
        url: &str,
        session: &mut SessionState,
    ) -> RenderResult<NavigationOutcome> {
        if let Some(failure) = self.load(client, url).await? {
            return Ok(NavigationOutcome::Unreachable(failure));
        }

        let location = Self::location(client).await;
        let Some(marker) = self.detect(&location).map(|m| m.to_string()) else {
            return Ok(NavigationOutcome::Clear);
        };

        tracing::warn!("Challenge detected at {} (matched '{}')", location, marker);
        let mut event = InterdictionEvent {
            url: url.to_string(),
            location,
            marker,
            detected_at: Utc::now(),
            resolved: false,
        };

        self.signal.wait_for_resolution(&event).await;
        tokio::time::sleep(self.challenge_pause).await;

        if let Some(failure) = self.load(client, url).await? {
            session.record_interdiction(event);
            return Ok(NavigationOutcome::Unreachable(failure));
        }

        let retried = Self::location(client).await;
        let outcome = if self.detect(&retried).is_some() {
            tracing::warn!("Still on a challenge page after retry: {}", retried);
            NavigationOutcome::StillChallenged
        } else {
            tracing::info!("Challenge resolved, continuing at {}", retried);
            event.resolved = true;
            NavigationOutcome::Resolved
        };
        session.record_interdiction(event);
        Ok(outcome)
    }

    /// Navigates and settles; `Some(message)` when the page failed to load
    async fn load(&self, client: &mut dyn RenderClient, url: &str) -> RenderResult<Option<String>> {
        match client.navigate(url).await {
            Ok(()) => {
                tokio::time::sleep(self.settle).await;
                Ok(None)
            }
            Err(e) if e.is_session_unavailable() => Err(e),
            Err(e) => {
                tracing::warn!("Navigation to {} failed: {}", url, e);
                Ok(Some(e.to_string()))
            }
        }
    }

    async fn location(client: &dyn RenderClient) -> String {
        client.current_url().await.unwrap_or_else(|e| {
            tracing::debug!("Current location unavailable: {}", e);
            String::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::MemoryRenderClient;
    use crate::state::SessionLimits;

    const PAGE: &str = "https://shop.example/item-i.1.2";

    fn guard() -> InterdictionGuard {
        InterdictionGuard::new(
            &InterdictionConfig::default(),
            &SessionConfig::immediate(),
            Box::new(AutoResolveSignal),
        )
    }

    fn session() -> SessionState {
        SessionState::new(SessionLimits {
            max_records: 1,
            review_limit: 1,
            star_limit_per_type: 1,
        })
    }

    #[test]
    fn test_detect() {
        let guard = guard();
        assert_eq!(guard.detect("https://shop.example/buyer/LOGIN?next=x"), Some("login"));
        assert_eq!(guard.detect("https://shop.example/verify/traffic"), Some("verify"));
        assert_eq!(guard.detect(PAGE), None);
    }

    #[tokio::test]
    async fn test_clear_navigation() {
        let mut client = MemoryRenderClient::new().with_page(PAGE, "<p></p>");
        client.open().await.unwrap();
        let mut session = session();

        let outcome = guard().safe_navigate(&mut client, PAGE, &mut session).await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Clear);
        assert!(session.interdictions().is_empty());
        assert_eq!(client.visits(PAGE), 1);
    }

    #[tokio::test]
    async fn test_challenge_is_resolved_with_one_retry() {
        let mut client = MemoryRenderClient::new()
            .with_page(PAGE, "<p></p>")
            .with_challenge(PAGE, 1);
        client.open().await.unwrap();
        let mut session = session();

        let outcome = guard().safe_navigate(&mut client, PAGE, &mut session).await.unwrap();
        assert_eq!(outcome, NavigationOutcome::Resolved);
        assert_eq!(client.visits(PAGE), 2);
        assert_eq!(session.interdictions().len(), 1);
        assert!(session.interdictions()[0].resolved);
        assert_eq!(session.interdictions()[0].marker, "captcha");
    }

    #[tokio::test]
    async fn test_persistent_challenge_is_reported() {
        let mut client = MemoryRenderClient::new()
            .with_page(PAGE, "<p></p>")
            .with_challenge(PAGE, 5);
        client.open().await.unwrap();
        let mut session = session();

        let outcome = guard().safe_navigate(&mut client, PAGE, &mut session).await.unwrap();
        assert_eq!(outcome, NavigationOutcome::StillChallenged);
        assert_eq!(client.visits(PAGE), 2);
        assert!(!session.interdictions()[0].resolved);
    }

    #[tokio::test]
    async fn test_unopened_session_is_an_error() {
        let mut client = MemoryRenderClient::new();
        let mut session = session();
        let err = guard().safe_navigate(&mut client, PAGE, &mut session).await.unwrap_err();
        assert!(err.is_session_unavailable());
    }
}
