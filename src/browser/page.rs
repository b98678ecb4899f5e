//! Chromium implementation of [`Surface`]
//!
//! Element lookup runs in the page through the locator script; pointer input is
//! dispatched as real CDP mouse events at the element's center so CSS `:hover`
//! and pointer listeners fire the way they do for a user.

use super::dialog::ChromeDialog;
use crate::error::{BrowserError, Result};
use crate::locator::{Locator, TEST_ID_ATTRIBUTE};
use crate::surface::Surface;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, InsertTextParams, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::EventJavascriptDialogOpening;
use chromiumoxide::page::Page;
use serde::Deserialize;
use std::time::Duration;

const VISIBLE_JS: &str = "const el = els[0]; if (!el) return false; \
    const r = el.getBoundingClientRect(); const s = getComputedStyle(el); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' \
    && s.display !== 'none' && parseFloat(s.opacity || '1') > 0;";

// Results are never `null`: CDP reports a null value as absent
const CENTER_JS: &str = "const el = els[0]; if (!el) return []; \
    el.scrollIntoView({block: 'center', inline: 'center'}); \
    const r = el.getBoundingClientRect(); \
    return [{x: r.left + r.width / 2, y: r.top + r.height / 2}];";

const TEXT_JS: &str = "return els.slice(0, 1).map((el) => \
    (el.textContent || '').replace(/\\s+/g, ' ').trim());";

const FOCUS_CLEAR_JS: &str = "const el = els[0]; if (!el) return false; \
    el.focus(); if ('value' in el) { el.value = ''; \
    el.dispatchEvent(new Event('input', {bubbles: true})); } return true;";

#[derive(Debug, Deserialize)]
struct Center {
    x: f64,
    y: f64,
}

/// Add `https://` when no scheme is given
pub(crate) fn normalize_url(url: &str) -> String {
    const SCHEMES: [&str; 5] = ["http://", "https://", "file://", "about:", "data:"];
    if SCHEMES.iter().any(|s| url.starts_with(s)) {
        url.to_string()
    } else {
        log::debug!("Normalizing URL: {} -> https://{}", url, url);
        format!("https://{}", url)
    }
}

#[derive(Clone)]
pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// Execute JavaScript in the page and deserialize the result
    pub async fn evaluate<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Other(format!("Script execution failed: {}", e)))?;

        result
            .into_value()
            .map_err(|e| BrowserError::Other(format!("Failed to deserialize result: {}", e)))
    }

    async fn query<T: serde::de::DeserializeOwned>(&self, locator: &Locator, body: &str) -> Result<T> {
        self.evaluate(&locator.script(body)?).await
    }

    async fn center(&self, locator: &Locator) -> Result<Center> {
        let centers: Vec<Center> = self.query(locator, CENTER_JS).await?;
        centers.into_iter().next().ok_or_else(|| BrowserError::ElementNotFound(locator.to_string()))
    }

    async fn mouse(&self, kind: DispatchMouseEventType, at: &Center, button: bool) -> Result<()> {
        let mut builder = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(at.x)
            .y(at.y);
        if button {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder.build().map_err(BrowserError::Other)?;
        self.page.execute(params).await?;
        Ok(())
    }

    pub async fn close(self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}

impl Surface for ChromePage {
    type Dialog = ChromeDialog;

    async fn goto(&self, url: &str) -> Result<()> {
        let url = normalize_url(url);
        log::info!("Navigating to {}", url);
        self.page.goto(url.as_str()).await.map_err(|e| {
            if e.to_string().contains("oneshot canceled") {
                BrowserError::NavigationFailed(
                    "Browser connection lost. The browser may have been closed or crashed."
                        .to_string(),
                )
            } else {
                BrowserError::NavigationFailed(format!("Failed to navigate to {}: {}", url, e))
            }
        })?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.page.url().await?.ok_or(BrowserError::NoPage)
    }

    async fn title(&self) -> Result<String> {
        self.page.get_title().await?.ok_or(BrowserError::NoPage)
    }

    async fn text_content(&self, locator: &Locator) -> Result<Option<String>> {
        let text: Vec<String> = self.query(locator, TEXT_JS).await?;
        Ok(text.into_iter().next())
    }

    async fn count(&self, locator: &Locator) -> Result<usize> {
        self.query(locator, "return els.length;").await
    }

    async fn is_visible(&self, locator: &Locator) -> Result<bool> {
        self.query(locator, VISIBLE_JS).await
    }

    async fn hover(&self, locator: &Locator) -> Result<()> {
        let at = self.center(locator).await?;
        self.mouse(DispatchMouseEventType::MouseMoved, &at, false).await
    }

    async fn click(&self, locator: &Locator, delay: Duration) -> Result<()> {
        let at = self.center(locator).await?;
        self.mouse(DispatchMouseEventType::MouseMoved, &at, false).await?;
        self.mouse(DispatchMouseEventType::MousePressed, &at, true).await?;
        tokio::time::sleep(delay).await;
        self.mouse(DispatchMouseEventType::MouseReleased, &at, true).await
    }

    async fn fill(&self, locator: &Locator, value: &str) -> Result<()> {
        let focused: bool = self.query(locator, FOCUS_CLEAR_JS).await?;
        if !focused {
            return Err(BrowserError::ElementNotFound(locator.to_string()));
        }
        self.page.execute(InsertTextParams::new(value)).await?;
        Ok(())
    }

    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn test_ids(&self) -> Result<Vec<String>> {
        let script = format!(
            "Array.from(document.querySelectorAll('[{attr}]')).map((el) => el.getAttribute('{attr}'))",
            attr = TEST_ID_ATTRIBUTE
        );
        self.evaluate(&script).await
    }

    async fn outer_html(&self, locator: &Locator) -> Result<Option<String>> {
        let html: Vec<String> = self
            .query(locator, "return els.slice(0, 1).map((el) => el.outerHTML);")
            .await?;
        Ok(html.into_iter().next())
    }

    async fn arm_dialog(&self, accept: bool) -> Result<ChromeDialog> {
        let events = self
            .page
            .event_listener::<EventJavascriptDialogOpening>()
            .await?;
        Ok(ChromeDialog::new(self.page.clone(), events, accept))
    }
}
