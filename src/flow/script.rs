//! Flow Types
//!
//! Defines the JSON structure for UI flows and their execution reports.

use crate::diagnostics::DomDiagnostics;
use crate::error::{BrowserError, Result};
use crate::expect::{UrlPattern, DEFAULT_TIMEOUT};
use crate::locator::Locator;
use crate::resolver::menu::{DEFAULT_CLICK_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_SETTLE};
use crate::resolver::MenuOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A named sequence of UI steps against one site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flow {
    /// Unique flow name (lowercase-hyphenated)
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Prefix for `goto` steps whose URL starts with `/`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default)]
    pub settings: FlowSettings,

    pub steps: Vec<FlowStep>,

    /// Cleanup steps run after `steps` on every outcome, e.g. deleting an
    /// account the flow signed up
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teardown: Vec<FlowStep>,
}

/// Timing and retry knobs, all optional in the file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    pub max_attempts: u32,
    pub settle_ms: u64,
    pub click_delay_ms: u64,

    /// Timeout for every expectation in the flow
    pub timeout_ms: u64,

    /// CSS selector whose markup is dumped when a menu fails to open
    pub diagnostics_scope: String,

    /// Role used by the item finder's accessible-name strategy
    pub item_role: String,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            settle_ms: DEFAULT_SETTLE.as_millis() as u64,
            click_delay_ms: DEFAULT_CLICK_DELAY.as_millis() as u64,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            diagnostics_scope: "header".to_string(),
            item_role: crate::resolver::finder::DEFAULT_ITEM_ROLE.to_string(),
        }
    }
}

impl FlowSettings {
    pub fn menu_options(&self) -> MenuOptions {
        MenuOptions {
            max_attempts: self.max_attempts,
            click_delay: Duration::from_millis(self.click_delay_ms),
            settle: Duration::from_millis(self.settle_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn click_delay(&self) -> Duration {
        Duration::from_millis(self.click_delay_ms)
    }
}

/// A dropdown entry: what it is called, its preferred test id, where it leads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    pub test_id: String,
    pub destination: UrlPattern,
}

impl MenuItem {
    pub fn new(label: impl Into<String>, test_id: impl Into<String>, destination: UrlPattern) -> Self {
        Self {
            label: label.into(),
            test_id: test_id.into(),
            destination,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.label.trim().is_empty() {
            return Err(BrowserError::InvalidArgument(
                "menu item label cannot be empty".to_string(),
            ));
        }
        if self.test_id.trim().is_empty() {
            return Err(BrowserError::InvalidArgument(format!(
                "menu item '{}' has an empty test id",
                self.label
            )));
        }
        self.destination.validate()
    }
}

/// One step of a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FlowStep {
    Goto {
        url: String,
    },
    Click {
        target: Locator,
    },
    Fill {
        target: Locator,
        value: String,
    },
    ExpectVisible {
        target: Locator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    ExpectUrl {
        url: UrlPattern,
    },
    /// Whole normalized text of the first match, or a substring when `exact` is false
    ExpectText {
        target: Locator,
        text: String,
        #[serde(default = "exact_by_default")]
        exact: bool,
    },
    ExpectTitle {
        title: String,
    },
    OpenMenu {
        trigger: Locator,
        marker: Locator,
    },
    /// Open the menu, resolve the item, click it, and check where it leads
    SelectMenuItem {
        trigger: Locator,
        marker: Locator,
        item: MenuItem,
    },
    /// Click `trigger` with a one-shot dialog handler armed first
    ExpectDialog {
        trigger: Locator,
        #[serde(default)]
        accept: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

fn exact_by_default() -> bool {
    true
}

impl FlowStep {
    pub fn action(&self) -> &'static str {
        match self {
            FlowStep::Goto { .. } => "goto",
            FlowStep::Click { .. } => "click",
            FlowStep::Fill { .. } => "fill",
            FlowStep::ExpectVisible { .. } => "expect_visible",
            FlowStep::ExpectUrl { .. } => "expect_url",
            FlowStep::ExpectText { .. } => "expect_text",
            FlowStep::ExpectTitle { .. } => "expect_title",
            FlowStep::OpenMenu { .. } => "open_menu",
            FlowStep::SelectMenuItem { .. } => "select_menu_item",
            FlowStep::ExpectDialog { .. } => "expect_dialog",
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            FlowStep::Goto { url } if url.trim().is_empty() => Err(
                BrowserError::InvalidArgument("goto requires a URL".to_string()),
            ),
            FlowStep::Goto { .. } => Ok(()),
            FlowStep::Click { target }
            | FlowStep::Fill { target, .. }
            | FlowStep::ExpectVisible { target, .. } => target.validate(),
            FlowStep::ExpectUrl { url } => url.validate(),
            FlowStep::ExpectText { text, .. } if text.trim().is_empty() => Err(
                BrowserError::InvalidArgument("expect_text requires text".to_string()),
            ),
            FlowStep::ExpectText { target, .. } => target.validate(),
            FlowStep::ExpectTitle { title } if title.trim().is_empty() => Err(
                BrowserError::InvalidArgument("expect_title requires a title".to_string()),
            ),
            FlowStep::ExpectTitle { .. } => Ok(()),
            FlowStep::OpenMenu { trigger, marker } => {
                trigger.validate()?;
                marker.validate()
            }
            FlowStep::SelectMenuItem {
                trigger,
                marker,
                item,
            } => {
                trigger.validate()?;
                marker.validate()?;
                item.validate()
            }
            FlowStep::ExpectDialog { trigger, .. } => trigger.validate(),
        }
    }
}

impl Flow {
    /// Load a flow from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let flow: Flow = serde_json::from_str(&content)?;
        Ok(flow)
    }

    /// Save this flow to a JSON file
    pub async fn to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Validate flow structure
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(BrowserError::InvalidArgument(
                "Flow name cannot be empty".to_string(),
            ));
        }

        if self.steps.is_empty() {
            return Err(BrowserError::InvalidArgument(
                "Flow must contain at least one step".to_string(),
            ));
        }

        if self.settings.max_attempts == 0 {
            return Err(BrowserError::InvalidArgument(
                "settings.max_attempts must be at least 1".to_string(),
            ));
        }

        for (i, step) in self.steps.iter().enumerate() {
            step.validate().map_err(|e| {
                BrowserError::InvalidArgument(format!("step {} ({}): {}", i + 1, step.action(), e))
            })?;
        }

        for (i, step) in self.teardown.iter().enumerate() {
            step.validate().map_err(|e| {
                BrowserError::InvalidArgument(format!(
                    "teardown step {} ({}): {}",
                    i + 1,
                    step.action(),
                    e
                ))
            })?;
        }

        Ok(())
    }

    /// Resolve a `goto` target against `base_url`
    pub fn absolute_url(&self, url: &str) -> String {
        match &self.base_url {
            Some(base) if url.starts_with('/') => {
                format!("{}{}", base.trim_end_matches('/'), url)
            }
            _ => url.to_string(),
        }
    }
}

/// Result of executing a single step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    /// Step number (1-indexed)
    pub step: usize,

    pub action: String,

    pub status: StepStatus,

    pub duration: Duration,

    /// Extra detail on success (resolved locator, final URL, dialog text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Complete report of a flow run
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub flow_name: String,

    /// RFC 3339 start time
    pub started_at: String,

    pub total_steps: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,

    pub total_duration: Duration,

    pub results: Vec<StepResult>,

    /// Outcome of the flow's teardown steps. Not counted in the totals above.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub teardown: Vec<StepResult>,

    /// DOM state captured when a menu failed to open
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DomDiagnostics>,
}

impl FlowReport {
    pub fn new(flow_name: String, total_steps: usize) -> Self {
        Self {
            flow_name,
            started_at: chrono::Utc::now().to_rfc3339(),
            total_steps,
            passed: 0,
            failed: 0,
            skipped: 0,
            total_duration: Duration::from_secs(0),
            results: Vec::with_capacity(total_steps),
            teardown: Vec::new(),
            diagnostics: None,
        }
    }

    /// Add a step result and update counters
    pub fn add_result(&mut self, result: StepResult) {
        self.total_duration += result.duration;

        match result.status {
            StepStatus::Passed => self.passed += 1,
            StepStatus::Failed => self.failed += 1,
            StepStatus::Skipped => self.skipped += 1,
        }

        self.results.push(result);
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.passed == self.total_steps
    }

    /// Percentage of steps that passed
    pub fn success_rate(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.passed as f64 / self.total_steps as f64) * 100.0
    }

    pub fn teardown_failures(&self) -> usize {
        self.teardown
            .iter()
            .filter(|r| r.status == StepStatus::Failed)
            .count()
    }

    pub fn first_failure(&self) -> Option<&StepResult> {
        self.results
            .iter()
            .find(|r| r.status == StepStatus::Failed)
    }
}
