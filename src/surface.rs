//! Interaction Surface
//!
//! The resolver algorithms only need a handful of page operations. They are
//! expressed as a trait so the retry and fallback logic can run against the
//! Chromium backend or an in-memory recording double.

use crate::error::Result;
use crate::locator::Locator;
use std::time::Duration;

/// Page operations used by the resolver, assertions and flow runner
#[allow(async_fn_in_trait)]
pub trait Surface {
    /// One-shot native dialog subscription produced by [`Surface::arm_dialog`]
    type Dialog: DialogWatch;

    async fn goto(&self, url: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Number of elements the locator currently matches
    async fn count(&self, locator: &Locator) -> Result<usize>;

    /// Whether the first match is rendered with a non-empty box
    async fn is_visible(&self, locator: &Locator) -> Result<bool>;

    /// Whitespace-normalized text of the first match, `None` when nothing matches
    async fn text_content(&self, locator: &Locator) -> Result<Option<String>>;

    async fn hover(&self, locator: &Locator) -> Result<()>;

    /// Press and release on the first match, holding for `delay`
    async fn click(&self, locator: &Locator, delay: Duration) -> Result<()>;

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()>;

    async fn pause(&self, duration: Duration);

    /// Every `data-testid` value present in the document
    async fn test_ids(&self) -> Result<Vec<String>>;

    /// Outer HTML of the first match, if any
    async fn outer_html(&self, locator: &Locator) -> Result<Option<String>>;

    /// Subscribe to the next native dialog. Must be called before the action
    /// that opens it.
    async fn arm_dialog(&self, accept: bool) -> Result<Self::Dialog>;
}

/// Consumed exactly once: resolves with the dialog message after handling it
#[allow(async_fn_in_trait)]
pub trait DialogWatch {
    async fn wait(self, timeout: Duration) -> Result<String>;
}

/// Non-throwing visibility check for use inside retry loops
pub async fn probe<S: Surface>(surface: &S, locator: &Locator) -> bool {
    match surface.is_visible(locator).await {
        Ok(visible) => visible,
        Err(e) => {
            log::debug!("probe of {} failed, treating as hidden: {}", locator, e);
            false
        }
    }
}
