use crate::config::Config;
use crate::models::Organization;
use crate::store::ReportStore;
use crate::texts::TextStore;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Metadata about the current call, taken from the gateway's first turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallInfo {
    /// Gateway call identifier.
    pub call_id: String,
    /// Caller line (ANI).
    pub caller: String,
    /// Called line (DID), which selects the organization.
    pub called: String,
    /// Digits that arrived together with the first turn, if any.
    pub entry_digits: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// Shared resources handed to every [`CallApp`](super::CallApp) handler.
///
/// Rebuilt for each turn so `now` reflects the moment the turn arrived.
#[derive(Clone)]
pub struct ApplicationContext {
    pub store: Arc<dyn ReportStore>,
    pub texts: Arc<dyn TextStore>,
    pub config: Arc<Config>,
    pub call_info: CallInfo,
    pub organization: Organization,
    /// Local time in the configured zone.
    pub now: DateTime<Tz>,
}

impl ApplicationContext {
    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    pub fn text(&self, key: &str) -> String {
        self.texts.get_text(self.organization.id, key, &[])
    }

    pub fn text_with(&self, key: &str, params: &[(&str, String)]) -> String {
        self.texts.get_text(self.organization.id, key, params)
    }

    /// Uses `key` when the catalog has it, otherwise `fallback`.
    pub fn text_or(&self, key: &str, fallback: &str) -> String {
        match self.texts.lookup(self.organization.id, key) {
            Some(text) => text,
            None => self.text(fallback),
        }
    }
}
