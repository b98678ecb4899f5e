//! Menu Opener
//!
//! Opens hover/click dropdowns that do not react reliably to a single
//! interaction. Each cycle tries a hover, then a click, then waits for CSS
//! transitions to settle, checking the "menu is open" marker after every
//! interaction.

use super::finder::ElementFinder;
use crate::error::{BrowserError, Result};
use crate::locator::Locator;
use crate::surface::{probe, Surface};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_CLICK_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(200);

/// Retry budget and timings for one `open` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuOptions {
    pub max_attempts: u32,

    /// Time between press and release, so the trigger does not see a double fire
    pub click_delay: Duration,

    /// Pause after a failed cycle
    pub settle: Duration,
}

impl Default for MenuOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            click_delay: DEFAULT_CLICK_DELAY,
            settle: DEFAULT_SETTLE,
        }
    }
}

/// Interaction that made the marker visible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenedBy {
    Hover,
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuOpened {
    /// 1-indexed cycle on which the menu opened
    pub attempts: u32,
    pub opened_by: OpenedBy,
}

pub struct MenuOpener {
    options: MenuOptions,
}

impl MenuOpener {
    pub fn new(options: MenuOptions) -> Result<Self> {
        if options.max_attempts == 0 {
            return Err(BrowserError::InvalidArgument(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> &MenuOptions {
        &self.options
    }

    /// Run hover/click/settle cycles until `marker` is visible.
    ///
    /// Interaction errors on the trigger are logged and the cycle continues;
    /// only an exhausted budget fails the call.
    pub async fn open<S: Surface>(
        &self,
        surface: &S,
        trigger: &Locator,
        marker: &Locator,
    ) -> Result<MenuOpened> {
        for attempt in 1..=self.options.max_attempts {
            log::debug!(
                "Opening menu via {} (attempt {}/{})",
                trigger,
                attempt,
                self.options.max_attempts
            );

            if let Err(e) = surface.hover(trigger).await {
                log::debug!("hover on {} failed: {}", trigger, e);
            }
            if probe(surface, marker).await {
                log::info!("Menu {} opened on hover (attempt {})", marker, attempt);
                return Ok(MenuOpened {
                    attempts: attempt,
                    opened_by: OpenedBy::Hover,
                });
            }

            if let Err(e) = surface.click(trigger, self.options.click_delay).await {
                log::debug!("click on {} failed: {}", trigger, e);
            }
            if probe(surface, marker).await {
                log::info!("Menu {} opened on click (attempt {})", marker, attempt);
                return Ok(MenuOpened {
                    attempts: attempt,
                    opened_by: OpenedBy::Click,
                });
            }

            surface.pause(self.options.settle).await;
        }

        log::warn!(
            "Menu {} still hidden after {} attempt(s) on {}",
            marker,
            self.options.max_attempts,
            trigger
        );
        Err(BrowserError::MenuDidNotOpen {
            trigger: trigger.to_string(),
            attempts: self.options.max_attempts,
        })
    }

    /// Open the menu, then resolve one of its items
    pub async fn open_and_resolve<S: Surface>(
        &self,
        surface: &S,
        trigger: &Locator,
        marker: &Locator,
        finder: &ElementFinder,
        label: &str,
        preferred_id: Option<&str>,
    ) -> Result<Locator> {
        self.open(surface, trigger, marker).await?;
        Ok(finder.resolve(surface, label, preferred_id).await)
    }
}
