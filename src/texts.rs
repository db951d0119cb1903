//! Organization-aware prompt texts.
//!
//! Texts live in a TOML catalog:
//!
//! ```toml
//! [default]
//! welcome = "Hello {name}"
//!
//! [org.3]
//! welcome = "Shalom {name}"
//! ```
//!
//! Lookup falls back from the organization table to `[default]` and finally
//! to the key itself, so a missing text never breaks a call.

use crate::models::OrganizationId;
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;

const BUILTIN_TEXTS: &str = include_str!("../config/texts.toml");

pub trait TextStore: Send + Sync {
    fn lookup(&self, organization_id: OrganizationId, key: &str) -> Option<String>;

    fn get_text(
        &self,
        organization_id: OrganizationId,
        key: &str,
        params: &[(&str, String)],
    ) -> String {
        let template = self
            .lookup(organization_id, key)
            .unwrap_or_else(|| key.to_string());
        render(&template, params)
    }
}

/// Replaces `{name}` placeholders. Unknown placeholders are left as-is.
pub fn render(template: &str, params: &[(&str, String)]) -> String {
    let mut text = template.to_string();
    for (name, value) in params {
        text = text.replace(&format!("{{{}}}", name), value);
    }
    text
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    default: HashMap<String, String>,
    #[serde(default)]
    org: HashMap<String, HashMap<String, String>>,
}

#[derive(Debug, Default, Clone)]
pub struct TextCatalog {
    defaults: HashMap<String, String>,
    organizations: HashMap<OrganizationId, HashMap<String, String>>,
}

impl TextCatalog {
    /// A catalog with no texts at all; every lookup yields the key.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_TEXTS)
    }

    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read texts '{}': {}", path, e))?;
        Self::from_toml_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse texts '{}': {}", path, e))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content)?;
        let mut organizations = HashMap::new();
        for (id, texts) in file.org {
            let id: OrganizationId = id
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid organization id '{}' in texts", id))?;
            organizations.insert(id, texts);
        }
        Ok(Self {
            defaults: file.default,
            organizations,
        })
    }

    /// Layers `other` on top of `self`; keys in `other` win.
    pub fn merge(mut self, other: TextCatalog) -> Self {
        self.defaults.extend(other.defaults);
        for (id, texts) in other.organizations {
            self.organizations.entry(id).or_default().extend(texts);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.defaults.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty()
    }
}

impl TextStore for TextCatalog {
    fn lookup(&self, organization_id: OrganizationId, key: &str) -> Option<String> {
        self.organizations
            .get(&organization_id)
            .and_then(|texts| texts.get(key))
            .or_else(|| self.defaults.get(key))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_order() {
        let catalog = TextCatalog::from_toml_str(
            r#"
[default]
welcome = "Hello {name}"
goodbye = "Bye"

[org.3]
welcome = "Shalom {name}"
"#,
        )
        .unwrap();

        let params = [("name", "Rivka".to_string())];
        assert_eq!(catalog.get_text(3, "welcome", &params), "Shalom Rivka");
        assert_eq!(catalog.get_text(4, "welcome", &params), "Hello Rivka");
        assert_eq!(catalog.get_text(3, "goodbye", &[]), "Bye");
        assert_eq!(catalog.get_text(3, "missing_key", &[]), "missing_key");
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let text = render("{a} and {b}", &[("a", "1".to_string())]);
        assert_eq!(text, "1 and {b}");
    }

    #[test]
    fn test_builtin_and_merge() {
        let builtin = TextCatalog::builtin().unwrap();
        assert!(builtin.lookup(1, "enter_date").is_some());

        let custom = TextCatalog::from_toml_str("[default]\nenter_date = \"Date please\"").unwrap();
        let merged = builtin.merge(custom);
        assert_eq!(merged.get_text(1, "enter_date", &[]), "Date please");
        assert!(merged.lookup(1, "goodbye").is_some());
    }

    #[test]
    fn test_bad_org_id() {
        assert!(TextCatalog::from_toml_str("[org.abc]\nx = \"y\"").is_err());
    }
}
