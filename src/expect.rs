//! Polling assertions
//!
//! Expectations poll the surface at a fixed interval up to a timeout. The
//! number of polls is derived from the timeout up front so the loop is bounded
//! by count, not wall clock.

use crate::error::{BrowserError, Result};
use crate::locator::Locator;
use crate::surface::{probe, Surface};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Expected navigation outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "match", content = "value", rename_all = "snake_case")]
pub enum UrlPattern {
    Exact(String),
    Contains(String),
    Regex(String),
}

impl UrlPattern {
    /// Check the pattern and build its matcher. Fails on an empty pattern or a
    /// regex that does not compile.
    pub fn compile(&self) -> Result<UrlMatcher<'_>> {
        let empty = || BrowserError::InvalidArgument("URL pattern cannot be empty".to_string());
        match self {
            UrlPattern::Exact(s) | UrlPattern::Contains(s) | UrlPattern::Regex(s)
                if s.is_empty() =>
            {
                Err(empty())
            }
            UrlPattern::Exact(s) => Ok(UrlMatcher::Exact(s)),
            UrlPattern::Contains(s) => Ok(UrlMatcher::Contains(s)),
            UrlPattern::Regex(s) => Regex::new(s)
                .map(UrlMatcher::Regex)
                .map_err(|e| BrowserError::InvalidArgument(format!("bad URL regex: {}", e))),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    /// One-off match. An invalid pattern matches nothing; use [`UrlPattern::compile`]
    /// to surface the error.
    pub fn matches(&self, url: &str) -> bool {
        self.compile().map(|m| m.matches(url)).unwrap_or(false)
    }
}

/// A validated [`UrlPattern`], with any regex compiled once
#[derive(Debug)]
pub enum UrlMatcher<'a> {
    Exact(&'a str),
    Contains(&'a str),
    Regex(Regex),
}

impl UrlMatcher<'_> {
    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlMatcher::Exact(expected) => url == *expected,
            UrlMatcher::Contains(fragment) => url.contains(fragment),
            UrlMatcher::Regex(re) => re.is_match(url),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::Exact(s) => write!(f, "== {}", s),
            UrlPattern::Contains(s) => write!(f, "contains {}", s),
            UrlPattern::Regex(s) => write!(f, "~ /{}/", s),
        }
    }
}

fn polls(timeout: Duration) -> u128 {
    (timeout.as_millis() / POLL_INTERVAL.as_millis()).max(1)
}

/// Wait until the first match of `locator` is visible.
///
/// Fails with `ElementNotVisible` naming `label`, the human-facing name the
/// caller was looking for.
pub async fn expect_visible<S: Surface>(
    surface: &S,
    locator: &Locator,
    label: &str,
    timeout: Duration,
) -> Result<()> {
    for i in 0..polls(timeout) {
        if probe(surface, locator).await {
            return Ok(());
        }
        if i + 1 < polls(timeout) {
            surface.pause(POLL_INTERVAL).await;
        }
    }

    log::warn!("{} ({}) not visible within {:?}", label, locator, timeout);
    Err(BrowserError::ElementNotVisible {
        label: label.to_string(),
    })
}

/// Wait until the current URL matches `pattern`
pub async fn expect_url<S: Surface>(
    surface: &S,
    pattern: &UrlPattern,
    timeout: Duration,
) -> Result<String> {
    let matcher = pattern.compile()?;
    let mut last = String::new();
    for i in 0..polls(timeout) {
        match surface.current_url().await {
            Ok(url) if matcher.matches(&url) => return Ok(url),
            Ok(url) => last = url,
            Err(e) => log::debug!("current_url failed while polling: {}", e),
        }
        if i + 1 < polls(timeout) {
            surface.pause(POLL_INTERVAL).await;
        }
    }

    Err(BrowserError::AssertionFailed(format!(
        "expected URL {} within {:?}, last saw '{}'",
        pattern, timeout, last
    )))
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Wait until the first match of `locator` has `expected` as its text, or
/// contains it when `exact` is false. Whitespace is normalized on both sides.
pub async fn expect_text<S: Surface>(
    surface: &S,
    locator: &Locator,
    expected: &str,
    exact: bool,
    timeout: Duration,
) -> Result<String> {
    let expected = normalize(expected);
    let mut last = None;
    for i in 0..polls(timeout) {
        match surface.text_content(locator).await {
            Ok(Some(text)) => {
                let found = if exact {
                    text == expected
                } else {
                    text.contains(expected.as_str())
                };
                if found {
                    return Ok(text);
                }
                last = Some(text);
            }
            Ok(None) => last = None,
            Err(e) => log::debug!("text of {} failed while polling: {}", locator, e),
        }
        if i + 1 < polls(timeout) {
            surface.pause(POLL_INTERVAL).await;
        }
    }

    Err(BrowserError::AssertionFailed(format!(
        "expected {} to {} '{}' within {:?}, last saw {}",
        locator,
        if exact { "have text" } else { "contain" },
        expected,
        timeout,
        last.map(|t| format!("'{}'", t))
            .unwrap_or_else(|| "no element".to_string())
    )))
}

/// Wait until the document title equals `expected`
pub async fn expect_title<S: Surface>(
    surface: &S,
    expected: &str,
    timeout: Duration,
) -> Result<String> {
    let mut last = String::new();
    for i in 0..polls(timeout) {
        match surface.title().await {
            Ok(title) if title == expected => return Ok(title),
            Ok(title) => last = title,
            Err(e) => log::debug!("title failed while polling: {}", e),
        }
        if i + 1 < polls(timeout) {
            surface.pause(POLL_INTERVAL).await;
        }
    }

    Err(BrowserError::AssertionFailed(format!(
        "expected title '{}' within {:?}, last saw '{}'",
        expected, timeout, last
    )))
}
