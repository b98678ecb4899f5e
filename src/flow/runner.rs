//! Flow Runner
//!
//! Executes a flow step by step against any [`Surface`], stopping at the first
//! failure and marking the remaining steps as skipped.

use super::script::{Flow, FlowReport, FlowStep, StepResult, StepStatus};
use crate::diagnostics::DomDiagnostics;
use crate::error::{BrowserError, Result};
use crate::expect::{expect_text, expect_title, expect_url, expect_visible};
use crate::locator::Locator;
use crate::resolver::{ElementFinder, MenuOpener};
use crate::surface::{DialogWatch, Surface};
use std::time::{Duration, Instant};

pub struct FlowRunner<'a, S: Surface> {
    surface: &'a S,
}

impl<'a, S: Surface> FlowRunner<'a, S> {
    pub fn new(surface: &'a S) -> Self {
        Self { surface }
    }

    /// Run a complete flow. Only an invalid flow is an `Err`; step failures
    /// are recorded in the report.
    pub async fn run(&self, flow: &Flow) -> Result<FlowReport> {
        flow.validate()?;

        let opener = MenuOpener::new(flow.settings.menu_options())?;
        let finder = ElementFinder::with_role(flow.settings.item_role.as_str());
        let mut report = FlowReport::new(flow.name.clone(), flow.steps.len());

        log::info!("Running flow '{}' ({} steps)", flow.name, flow.steps.len());

        let mut failed = false;
        for (i, step) in flow.steps.iter().enumerate() {
            let number = i + 1;

            if failed {
                report.add_result(StepResult {
                    step: number,
                    action: step.action().to_string(),
                    status: StepStatus::Skipped,
                    duration: Duration::ZERO,
                    detail: None,
                    error: None,
                });
                continue;
            }

            let start = Instant::now();
            match self.execute_step(flow, step, &opener, &finder).await {
                Ok(detail) => {
                    log::info!("✓ step {} {}", number, step.action());
                    report.add_result(StepResult {
                        step: number,
                        action: step.action().to_string(),
                        status: StepStatus::Passed,
                        duration: start.elapsed(),
                        detail,
                        error: None,
                    });
                }
                Err(e) => {
                    log::error!("✗ step {} {} failed: {}", number, step.action(), e);

                    if matches!(e, BrowserError::MenuDidNotOpen { .. }) {
                        let scope = Locator::css(flow.settings.diagnostics_scope.as_str());
                        let diagnostics = DomDiagnostics::capture(self.surface, &scope).await;
                        diagnostics.log();
                        report.diagnostics = Some(diagnostics);
                    }

                    report.add_result(StepResult {
                        step: number,
                        action: step.action().to_string(),
                        status: StepStatus::Failed,
                        duration: start.elapsed(),
                        detail: None,
                        error: Some(e.to_string()),
                    });
                    failed = true;
                }
            }
        }

        // teardown runs whatever happened above; its failures never stop it
        for (i, step) in flow.teardown.iter().enumerate() {
            let start = Instant::now();
            let (status, detail, error) =
                match self.execute_step(flow, step, &opener, &finder).await {
                    Ok(detail) => (StepStatus::Passed, detail, None),
                    Err(e) => {
                        log::warn!("teardown step {} {} failed: {}", i + 1, step.action(), e);
                        (StepStatus::Failed, None, Some(e.to_string()))
                    }
                };
            report.teardown.push(StepResult {
                step: i + 1,
                action: step.action().to_string(),
                status,
                duration: start.elapsed(),
                detail,
                error,
            });
        }

        log::info!(
            "Flow '{}' finished: {}/{} passed",
            flow.name,
            report.passed,
            report.total_steps
        );
        Ok(report)
    }

    async fn execute_step(
        &self,
        flow: &Flow,
        step: &FlowStep,
        opener: &MenuOpener,
        finder: &ElementFinder,
    ) -> Result<Option<String>> {
        let settings = &flow.settings;
        let timeout = settings.timeout();

        match step {
            FlowStep::Goto { url } => {
                let url = flow.absolute_url(url);
                self.surface.goto(&url).await?;
                Ok(Some(url))
            }
            FlowStep::Click { target } => {
                expect_visible(self.surface, target, &target.to_string(), timeout).await?;
                self.surface.click(target, settings.click_delay()).await?;
                Ok(None)
            }
            FlowStep::Fill { target, value } => {
                expect_visible(self.surface, target, &target.to_string(), timeout).await?;
                self.surface.fill(target, value).await?;
                Ok(None)
            }
            FlowStep::ExpectVisible { target, label } => {
                let label = label.clone().unwrap_or_else(|| target.to_string());
                expect_visible(self.surface, target, &label, timeout).await?;
                Ok(None)
            }
            FlowStep::ExpectUrl { url } => {
                let current = expect_url(self.surface, url, timeout).await?;
                Ok(Some(current))
            }
            FlowStep::ExpectText {
                target,
                text,
                exact,
            } => {
                let found = expect_text(self.surface, target, text, *exact, timeout).await?;
                Ok(Some(found))
            }
            FlowStep::ExpectTitle { title } => {
                let found = expect_title(self.surface, title, timeout).await?;
                Ok(Some(found))
            }
            FlowStep::OpenMenu { trigger, marker } => {
                let opened = opener.open(self.surface, trigger, marker).await?;
                Ok(Some(format!(
                    "opened by {:?} on attempt {}",
                    opened.opened_by, opened.attempts
                )))
            }
            FlowStep::SelectMenuItem {
                trigger,
                marker,
                item,
            } => {
                let target = opener
                    .open_and_resolve(
                        self.surface,
                        trigger,
                        marker,
                        finder,
                        &item.label,
                        Some(item.test_id.as_str()),
                    )
                    .await?;
                expect_visible(self.surface, &target, &item.label, timeout).await?;
                self.surface.click(&target, settings.click_delay()).await?;
                let landed = expect_url(self.surface, &item.destination, timeout).await?;
                Ok(Some(format!("{} -> {}", target, landed)))
            }
            FlowStep::ExpectDialog {
                trigger,
                accept,
                message,
            } => {
                expect_visible(self.surface, trigger, &trigger.to_string(), timeout).await?;
                // armed before the click so the dialog cannot block unobserved;
                // the click itself may not complete until the dialog is handled
                let dialog = self.surface.arm_dialog(*accept).await?;
                let (text, clicked) = futures::join!(
                    dialog.wait(timeout),
                    self.surface.click(trigger, settings.click_delay())
                );
                clicked?;
                let text = text?;

                if let Some(expected) = message {
                    if !text.contains(expected.as_str()) {
                        return Err(BrowserError::AssertionFailed(format!(
                            "dialog said '{}', expected '{}'",
                            text, expected
                        )));
                    }
                }
                Ok(Some(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expect::UrlPattern;
    use crate::flow::script::{FlowSettings, MenuItem};
    use crate::surface::mock::{Call, MockSurface, Opens};

    fn flow(steps: Vec<FlowStep>) -> Flow {
        Flow {
            name: "test-flow".to_string(),
            description: None,
            base_url: Some("https://app.example.com".to_string()),
            settings: FlowSettings {
                timeout_ms: 300,
                ..FlowSettings::default()
            },
            steps,
            teardown: Vec::new(),
        }
    }

    fn select_settings() -> FlowStep {
        FlowStep::SelectMenuItem {
            trigger: Locator::test_id("profile-trigger"),
            marker: Locator::test_id("profile-dropdown"),
            item: MenuItem::new(
                "Settings",
                "profile-dropdown-Settings",
                UrlPattern::Contains("/settings".to_string()),
            ),
        }
    }

    #[tokio::test]
    async fn test_select_menu_item_flow() {
        let item = Locator::test_id("profile-dropdown-Settings");
        let surface = MockSurface::new()
            .with_element(Locator::test_id("profile-trigger"), 1)
            .with_element(item.clone(), 1)
            .with_menu(Locator::test_id("profile-dropdown"), Opens::OnHover(1))
            .with_link(item.clone(), "https://app.example.com/settings");

        let report = FlowRunner::new(&surface)
            .run(&flow(vec![
                FlowStep::Goto {
                    url: "/".to_string(),
                },
                select_settings(),
            ]))
            .await
            .unwrap();

        assert!(report.is_success(), "{:?}", report.results);
        assert_eq!(surface.calls()[0], Call::Goto("https://app.example.com/".to_string()));
        assert!(surface
            .calls()
            .contains(&Call::Click(item, Duration::from_millis(100))));
        assert!(report.diagnostics.is_none());
    }

    #[tokio::test]
    async fn test_menu_failure_captures_diagnostics_and_skips_rest() {
        let surface = MockSurface::new()
            .with_element(Locator::test_id("profile-trigger"), 1)
            .with_menu(Locator::test_id("profile-dropdown"), Opens::Never);

        let report = FlowRunner::new(&surface)
            .run(&flow(vec![
                select_settings(),
                FlowStep::ExpectUrl {
                    url: UrlPattern::Contains("/settings".to_string()),
                },
            ]))
            .await
            .unwrap();

        assert_eq!((report.passed, report.failed, report.skipped), (0, 1, 1));
        let failure = report.first_failure().unwrap();
        assert!(failure.error.as_ref().unwrap().contains("Menu did not open"));

        let diagnostics = report.diagnostics.expect("diagnostics captured");
        assert_eq!(diagnostics.test_ids, vec!["profile-trigger"]);
        assert_eq!(diagnostics.markup.as_deref(), Some("<mock>css=header</mock>"));
    }

    #[tokio::test]
    async fn test_unresolved_item_reports_label() {
        let surface = MockSurface::new()
            .with_element(Locator::test_id("profile-trigger"), 1)
            .with_menu(Locator::test_id("profile-dropdown"), Opens::OnClick(1));

        let report = FlowRunner::new(&surface)
            .run(&flow(vec![select_settings()]))
            .await
            .unwrap();

        let failure = report.first_failure().unwrap();
        assert_eq!(
            failure.error.as_deref(),
            Some("Element 'Settings' is not visible")
        );
        assert!(report.diagnostics.is_none());
    }

    #[tokio::test]
    async fn test_expect_dialog() {
        let button = Locator::role_named("button", "Sign up");
        let mut surface = MockSurface::new().with_element(button.clone(), 1);
        surface.dialog = Some("Please enter a valid email address".to_string());

        let step = FlowStep::ExpectDialog {
            trigger: button.clone(),
            accept: true,
            message: Some("valid email".to_string()),
        };
        let report = FlowRunner::new(&surface)
            .run(&flow(vec![step.clone()]))
            .await
            .unwrap();
        assert!(report.is_success());
        assert_eq!(
            report.results[0].detail.as_deref(),
            Some("Please enter a valid email address")
        );

        surface.dialog = None;
        let report = FlowRunner::new(&surface).run(&flow(vec![step])).await.unwrap();
        let failure = report.first_failure().unwrap();
        assert!(failure
            .error
            .as_ref()
            .unwrap()
            .starts_with("Expected a native dialog"));
    }

    #[tokio::test]
    async fn test_fill_and_click() {
        let email = Locator::test_id("email");
        let submit = Locator::role_named("button", "Sign in");
        let surface = MockSurface::new()
            .with_element(email.clone(), 1)
            .with_element(submit.clone(), 1)
            .with_link(submit.clone(), "https://app.example.com/dashboard");

        let report = FlowRunner::new(&surface)
            .run(&flow(vec![
                FlowStep::Fill {
                    target: email.clone(),
                    value: "qa@example.com".to_string(),
                },
                FlowStep::Click { target: submit },
                FlowStep::ExpectUrl {
                    url: UrlPattern::Regex("/dashboard$".to_string()),
                },
            ]))
            .await
            .unwrap();

        assert!(report.is_success());
        assert!(surface
            .calls()
            .contains(&Call::Fill(email, "qa@example.com".to_string())));
    }

    #[tokio::test]
    async fn test_invalid_flow_is_rejected() {
        let surface = MockSurface::new();
        let result = FlowRunner::new(&surface).run(&flow(vec![])).await;
        assert!(matches!(result, Err(BrowserError::InvalidArgument(_))));
        assert!(surface.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expect_text_and_title_steps() {
        let welcome = Locator::test_id("welcome-banner");
        let mut surface = MockSurface::new().with_text(welcome.clone(), "Welcome back, QA Bot!");
        surface.title = "Dashboard".to_string();

        let report = FlowRunner::new(&surface)
            .run(&flow(vec![
                FlowStep::ExpectText {
                    target: welcome.clone(),
                    text: "Welcome back".to_string(),
                    exact: false,
                },
                FlowStep::ExpectTitle {
                    title: "Dashboard".to_string(),
                },
                FlowStep::ExpectText {
                    target: welcome,
                    text: "Welcome back".to_string(),
                    exact: true,
                },
            ]))
            .await
            .unwrap();

        assert_eq!((report.passed, report.failed), (2, 1));
        assert_eq!(
            report.results[0].detail.as_deref(),
            Some("Welcome back, QA Bot!")
        );
        assert_eq!(report.results[1].detail.as_deref(), Some("Dashboard"));
        assert!(report.results[2]
            .error
            .as_ref()
            .unwrap()
            .contains("to have text 'Welcome back'"));
    }

    #[tokio::test]
    async fn test_teardown_runs_after_failure() {
        let delete = Locator::test_id("delete-account");
        let surface = MockSurface::new()
            .with_element(Locator::test_id("profile-trigger"), 1)
            .with_element(delete.clone(), 1)
            .with_menu(Locator::test_id("profile-dropdown"), Opens::Never);

        let mut flow = flow(vec![select_settings()]);
        flow.teardown = vec![
            FlowStep::Goto {
                url: "/account".to_string(),
            },
            FlowStep::Click {
                target: Locator::test_id("missing-confirm"),
            },
            FlowStep::Click {
                target: delete.clone(),
            },
        ];

        let report = FlowRunner::new(&surface).run(&flow).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.total_steps, 1);
        let statuses: Vec<StepStatus> = report.teardown.iter().map(|r| r.status).collect();
        assert_eq!(
            statuses,
            [StepStatus::Passed, StepStatus::Failed, StepStatus::Passed]
        );
        assert_eq!(report.teardown_failures(), 1);
        assert!(surface
            .calls()
            .contains(&Call::Goto("https://app.example.com/account".to_string())));
        assert!(surface
            .calls()
            .contains(&Call::Click(delete, Duration::from_millis(100))));
    }

    #[tokio::test]
    async fn test_invalid_teardown_step_is_rejected() {
        let surface = MockSurface::new();
        let mut flow = flow(vec![FlowStep::Goto {
            url: "/".to_string(),
        }]);
        flow.teardown = vec![FlowStep::ExpectTitle {
            title: " ".to_string(),
        }];

        let err = FlowRunner::new(&surface).run(&flow).await.unwrap_err();
        assert!(err.to_string().contains("teardown step 1 (expect_title)"), "{err}");
        assert!(surface.calls().is_empty());
    }
}
