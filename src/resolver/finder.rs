//! Element Finder
//!
//! Resolves a menu item by label, preferring the stable identifier, then the
//! accessible role and name, then visible text.

use crate::locator::Locator;
use crate::surface::Surface;

pub const DEFAULT_ITEM_ROLE: &str = "menuitem";

/// Which strategy produced a locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    TestId,
    Role,
    Text,
}

pub struct ElementFinder {
    role: String,
}

impl Default for ElementFinder {
    fn default() -> Self {
        Self::with_role(DEFAULT_ITEM_ROLE)
    }
}

impl ElementFinder {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    /// Resolve `label` to a locator. Never fails; the result may match nothing,
    /// which surfaces when the caller asserts visibility.
    pub async fn resolve<S: Surface>(
        &self,
        surface: &S,
        label: &str,
        preferred_id: Option<&str>,
    ) -> Locator {
        self.resolve_with_strategy(surface, label, preferred_id)
            .await
            .1
    }

    pub async fn resolve_with_strategy<S: Surface>(
        &self,
        surface: &S,
        label: &str,
        preferred_id: Option<&str>,
    ) -> (Strategy, Locator) {
        if let Some(id) = preferred_id.filter(|id| !id.is_empty()) {
            let by_id = Locator::test_id(id);
            if matches(surface, &by_id).await {
                log::debug!("Resolved '{}' by test id {}", label, id);
                return (Strategy::TestId, by_id);
            }
        }

        let by_role = Locator::role_named(self.role.as_str(), label);
        if matches(surface, &by_role).await {
            log::debug!("Resolved '{}' by role {}", label, self.role);
            return (Strategy::Role, by_role);
        }

        log::debug!("Falling back to visible text for '{}'", label);
        (Strategy::Text, Locator::visible_text(label).first())
    }
}

async fn matches<S: Surface>(surface: &S, locator: &Locator) -> bool {
    match surface.count(locator).await {
        Ok(n) => n > 0,
        Err(e) => {
            log::debug!("count of {} failed: {}", locator, e);
            false
        }
    }
}
