//! DOM diagnostics captured when an interaction gives up

use crate::locator::Locator;
use crate::surface::Surface;
use serde::{Deserialize, Serialize};

/// Markup beyond this many characters is cut
const MAX_MARKUP_CHARS: usize = 4000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DomDiagnostics {
    pub url: Option<String>,

    /// Every `data-testid` value in the document, in document order
    pub test_ids: Vec<String>,

    /// Outer HTML of the scope element (typically the page header)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markup: Option<String>,
}

impl DomDiagnostics {
    /// Best-effort capture: individual failures are logged and left empty
    pub async fn capture<S: Surface>(surface: &S, scope: &Locator) -> Self {
        let url = surface
            .current_url()
            .await
            .map_err(|e| log::warn!("diagnostics: could not read URL: {}", e))
            .ok();

        let test_ids = surface.test_ids().await.unwrap_or_else(|e| {
            log::warn!("diagnostics: could not list test ids: {}", e);
            Vec::new()
        });

        let markup = match surface.outer_html(scope).await {
            Ok(html) => html.map(|h| truncate(&h, MAX_MARKUP_CHARS)),
            Err(e) => {
                log::warn!("diagnostics: could not read markup of {}: {}", scope, e);
                None
            }
        };

        Self {
            url,
            test_ids,
            markup,
        }
    }

    pub fn log(&self) {
        log::warn!(
            "Visible test ids at {}: [{}]",
            self.url.as_deref().unwrap_or("<unknown>"),
            self.test_ids.join(", ")
        );
        if let Some(markup) = &self.markup {
            log::warn!("Scope markup:\n{}", markup);
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::mock::MockSurface;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc…");
        assert_eq!(truncate("ééé", 2), "éé…");
    }

    #[tokio::test]
    async fn test_capture() {
        let surface = MockSurface::new()
            .with_element(Locator::test_id("navbar"), 1)
            .with_element(Locator::test_id("profile-trigger"), 1);

        let diag = DomDiagnostics::capture(&surface, &Locator::css("header")).await;

        assert_eq!(diag.url.as_deref(), Some("about:blank"));
        assert_eq!(diag.test_ids, vec!["navbar", "profile-trigger"]);
        assert_eq!(diag.markup.as_deref(), Some("<mock>css=header</mock>"));
    }
}
