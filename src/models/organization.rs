use super::OrganizationId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    /// The called line (DID) that routes calls to this organization.
    pub line: String,
    /// When set, every call is answered with `maintenance_message` and dropped.
    #[serde(default)]
    pub maintenance: bool,
    #[serde(default)]
    pub maintenance_message: Option<String>,
}

impl Organization {
    pub fn new(id: OrganizationId, name: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            line: line.into(),
            maintenance: false,
            maintenance_message: None,
        }
    }
}
