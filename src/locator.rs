//! Element Locators
//!
//! A locator is a serializable description of how to find elements in the
//! rendered DOM. It is evaluated lazily: building one never touches the page,
//! and a locator may match zero elements at use time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute used as the stable identifier contract
pub const TEST_ID_ATTRIBUTE: &str = "data-testid";

/// How elements are selected
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// Stable identifier (`data-testid`)
    TestId { value: String },

    /// ARIA role, explicit or implicit, with an optional exact accessible name
    Role {
        role: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Exact (whitespace-normalized) text content
    Text {
        text: String,
        #[serde(default)]
        exclude_hidden: bool,
    },

    /// Raw CSS selector
    Css { value: String },

    /// Raw XPath expression
    #[serde(rename = "xpath")]
    XPath { value: String },
}

/// A selector plus an optional index into its matches
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    #[serde(flatten)]
    pub selector: Selector,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nth: Option<usize>,
}

impl Locator {
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            nth: None,
        }
    }

    pub fn test_id(value: impl Into<String>) -> Self {
        Self::new(Selector::TestId {
            value: value.into(),
        })
    }

    pub fn role(role: impl Into<String>) -> Self {
        Self::new(Selector::Role {
            role: role.into(),
            name: None,
        })
    }

    pub fn role_named(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(Selector::Role {
            role: role.into(),
            name: Some(name.into()),
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Selector::Text {
            text: text.into(),
            exclude_hidden: false,
        })
    }

    /// Text match that skips anything inside an `aria-hidden="true"` subtree
    pub fn visible_text(text: impl Into<String>) -> Self {
        Self::new(Selector::Text {
            text: text.into(),
            exclude_hidden: true,
        })
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(Selector::Css {
            value: value.into(),
        })
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(Selector::XPath {
            value: value.into(),
        })
    }

    /// Narrow to the match at `index`
    pub fn nth(mut self, index: usize) -> Self {
        self.nth = Some(index);
        self
    }

    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// Reject locators with empty selector values
    pub fn validate(&self) -> crate::error::Result<()> {
        let empty = match &self.selector {
            Selector::TestId { value } | Selector::Css { value } | Selector::XPath { value } => {
                value.trim().is_empty()
            }
            Selector::Role { role, .. } => role.trim().is_empty(),
            Selector::Text { text, .. } => text.trim().is_empty(),
        };

        if empty {
            return Err(crate::error::BrowserError::InvalidArgument(format!(
                "locator {} has an empty selector",
                self
            )));
        }
        Ok(())
    }

    /// Build a JavaScript expression that collects this locator's matches into
    /// `els` and then evaluates `body` with it in scope.
    pub fn script(&self, body: &str) -> crate::error::Result<String> {
        let spec = serde_json::to_string(self)?;
        Ok(format!(
            "(() => {{ const els = ({})({}); {} }})()",
            LOCATE_JS, spec, body
        ))
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Selector::TestId { value } => write!(f, "[{}=\"{}\"]", TEST_ID_ATTRIBUTE, value)?,
            Selector::Role { role, name: None } => write!(f, "role={}", role)?,
            Selector::Role {
                role,
                name: Some(name),
            } => write!(f, "role={}[name=\"{}\"]", role, name)?,
            Selector::Text {
                text,
                exclude_hidden,
            } => {
                write!(f, "text=\"{}\"", text)?;
                if *exclude_hidden {
                    write!(f, ":not([aria-hidden=\"true\"] *)")?;
                }
            }
            Selector::Css { value } => write!(f, "css={}", value)?,
            Selector::XPath { value } => write!(f, "xpath={}", value)?,
        }
        if let Some(n) = self.nth {
            write!(f, " >> nth={}", n)?;
        }
        Ok(())
    }
}

/// Page-side resolver. Takes the serialized `Locator` and returns an array of
/// matching elements in document order.
const LOCATE_JS: &str = r#"(spec) => {
    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
    const implicitRole = (el) => {
        const tag = el.tagName.toLowerCase();
        if (tag === 'a' && el.hasAttribute('href')) return 'link';
        if (tag === 'button') return 'button';
        if (/^h[1-6]$/.test(tag)) return 'heading';
        if (tag === 'nav') return 'navigation';
        if (tag === 'footer') return 'contentinfo';
        if (tag === 'header') return 'banner';
        if (tag === 'input') {
            const type = (el.getAttribute('type') || 'text').toLowerCase();
            if (type === 'checkbox') return 'checkbox';
            if (type === 'submit' || type === 'button') return 'button';
            return 'textbox';
        }
        return null;
    };
    const role = (el) => el.getAttribute('role') || implicitRole(el);
    const accessibleName = (el) => {
        const label = el.getAttribute('aria-label');
        if (label) return norm(label);
        const by = el.getAttribute('aria-labelledby');
        if (by) {
            return norm(by.split(/\s+/).map((id) => {
                const ref = document.getElementById(id);
                return ref ? ref.textContent : '';
            }).join(' '));
        }
        if (el.tagName === 'INPUT') return norm(el.value || el.getAttribute('placeholder'));
        return norm(el.textContent);
    };
    const isHidden = (el) => el.closest('[aria-hidden="true"]') !== null;
    const all = () => Array.from(document.querySelectorAll('body *'));

    let found = [];
    switch (spec.kind) {
        case 'test_id':
            found = all().filter((el) => el.getAttribute('data-testid') === spec.value);
            break;
        case 'role':
            found = all().filter((el) => role(el) === spec.role
                && (spec.name == null || accessibleName(el) === norm(spec.name)));
            break;
        case 'text': {
            const want = norm(spec.text);
            found = all().filter((el) => norm(el.textContent) === want
                && !Array.from(el.children).some((c) => norm(c.textContent) === want));
            if (spec.exclude_hidden) found = found.filter((el) => !isHidden(el));
            break;
        }
        case 'css':
            found = Array.from(document.querySelectorAll(spec.value));
            break;
        case 'xpath': {
            const snap = document.evaluate(spec.value, document, null,
                XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
            for (let i = 0; i < snap.snapshotLength; i++) found.push(snap.snapshotItem(i));
            break;
        }
    }
    if (spec.nth != null) found = found[spec.nth] ? [found[spec.nth]] : [];
    return found;
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_json_shape() {
        let locator = Locator::role_named("menuitem", "Settings");
        let json = serde_json::to_value(&locator).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "role", "role": "menuitem", "name": "Settings"})
        );

        let parsed: Locator =
            serde_json::from_str(r#"{"kind": "xpath", "value": "//footer//a", "nth": 2}"#)
                .unwrap();
        assert_eq!(parsed, Locator::xpath("//footer//a").nth(2));
    }

    #[test]
    fn test_text_defaults_to_including_hidden() {
        let parsed: Locator = serde_json::from_str(r#"{"kind": "text", "text": "Sign in"}"#).unwrap();
        assert_eq!(parsed, Locator::text("Sign in"));
        assert_ne!(parsed, Locator::visible_text("Sign in"));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Locator::test_id("profile-trigger").to_string(),
            "[data-testid=\"profile-trigger\"]"
        );
        assert_eq!(
            Locator::visible_text("Settings").first().to_string(),
            "text=\"Settings\":not([aria-hidden=\"true\"] *) >> nth=0"
        );
        assert_eq!(Locator::text("Help").to_string(), "text=\"Help\"");
        assert_eq!(Locator::role("navigation").to_string(), "role=navigation");
    }

    #[test]
    fn test_validate_rejects_empty_values() {
        assert!(Locator::test_id("").validate().is_err());
        assert!(Locator::text("   ").validate().is_err());
        assert!(Locator::role_named("", "x").validate().is_err());
        assert!(Locator::css("header").validate().is_ok());
    }

    #[test]
    fn test_script_embeds_locator_json() {
        let script = Locator::test_id("a\"b").script("return els.length;").unwrap();
        assert!(script.starts_with("(() => {"));
        assert!(script.contains(r#"{"kind":"test_id","value":"a\"b"}"#));
        assert!(script.ends_with("return els.length; })()"));
    }
}
