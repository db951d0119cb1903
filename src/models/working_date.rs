use super::{OrganizationId, TeacherType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Marks `date` as a valid reporting day for one teacher type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingDate {
    pub organization_id: OrganizationId,
    pub teacher_type: TeacherType,
    pub date: NaiveDate,
}
