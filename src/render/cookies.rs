//! Cookie persistence between sessions
//!
//! Cookies collected by one run are saved to a JSON file keyed to the crawl
//! domain and installed into the next session before the first search, so
//! a challenge solved once is not asked again.

use crate::storage::{write_atomic, StorageResult};
use crate::url::{cookie_domain_matches, domain_of};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A browser cookie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,

    /// Domain attribute; empty means host-only for the jar's domain
    #[serde(default)]
    pub domain: String,

    #[serde(default = "default_path")]
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<DateTime<Utc>>,

    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub http_only: bool,
}

fn default_path() -> String {
    "/".to_string()
}

impl Cookie {
    /// Creates a session cookie for a domain
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    /// Returns true if the cookie expired before `now`
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }

    /// Renders the cookie as a `Set-Cookie` header value
    pub fn to_set_cookie(&self) -> String {
        let mut header = format!("{}={}; Path={}", self.name, self.value, self.path);
        if !self.domain.is_empty() {
            header.push_str(&format!("; Domain={}", self.domain));
        }
        if let Some(expires) = self.expires {
            header.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }

    /// Parses a `Cookie` request header into name/value cookies
    pub fn parse_header(header: &str, domain: &str) -> Vec<Cookie> {
        header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                let name = name.trim();
                if name.is_empty() {
                    return None;
                }
                Some(Cookie::new(name, value.trim(), domain))
            })
            .collect()
    }
}

/// On-disk layout of the jar file
#[derive(Debug, Serialize, Deserialize)]
struct JarFile {
    domain: String,
    saved_at: DateTime<Utc>,
    cookies: Vec<Cookie>,
}

/// Loads and saves the cookies of one crawl domain
#[derive(Debug, Clone)]
pub struct CookieJar {
    path: PathBuf,
    domain: String,
}

impl CookieJar {
    /// Creates a jar for the domain of `site_url`
    ///
    /// Returns `None` if the URL has no host.
    pub fn for_site(path: impl Into<PathBuf>, site_url: &str) -> Option<Self> {
        domain_of(site_url).map(|domain| Self {
            path: path.into(),
            domain,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Loads unexpired cookies saved for this jar's domain
    ///
    /// Missing, unreadable or foreign files yield no cookies; problems are
    /// logged, never returned.
    pub fn load(&self) -> Vec<Cookie> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No cookie file at {}", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!("Could not read cookies from {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let jar: JarFile = match serde_json::from_str(&text) {
            Ok(jar) => jar,
            Err(e) => {
                tracing::warn!("Ignoring malformed cookie file {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        if !cookie_domain_matches(&jar.domain, &self.domain) {
            tracing::warn!(
                "Cookie file {} belongs to {}, not {}",
                self.path.display(),
                jar.domain,
                self.domain
            );
            return Vec::new();
        }

        let now = Utc::now();
        let cookies: Vec<Cookie> = jar
            .cookies
            .into_iter()
            .filter(|c| !c.is_expired(now))
            .collect();
        tracing::debug!("Loaded {} cookies for {}", cookies.len(), self.domain);
        cookies
    }

    /// Saves cookies, replacing the file atomically
    pub fn save(&self, cookies: &[Cookie]) -> StorageResult<()> {
        let jar = JarFile {
            domain: self.domain.clone(),
            saved_at: Utc::now(),
            cookies: cookies.to_vec(),
        };
        let text = serde_json::to_string_pretty(&jar)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        write_atomic(&self.path, text.as_bytes())?;
        tracing::debug!("Saved {} cookies to {}", cookies.len(), self.path.display());
        Ok(())
    }
}
