use super::{AnswerId, OrganizationId, QuestionId, ReportId, TeacherId, TeacherType};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ALLOWED_DIGITS: &str = "01";

/// A survey question assigned by the office, asked before the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    pub organization_id: OrganizationId,
    /// `None` means every teacher type is asked.
    #[serde(default)]
    pub teacher_type: Option<TeacherType>,
    pub content: String,
    #[serde(default)]
    pub allowed_digits: Option<String>,
    /// Answering a standalone question ends the call.
    #[serde(default)]
    pub is_standalone: bool,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

fn default_active() -> bool {
    true
}

impl Question {
    pub fn allowed_digits(&self) -> &str {
        match self.allowed_digits.as_deref() {
            Some(digits) if !digits.is_empty() => digits,
            _ => DEFAULT_ALLOWED_DIGITS,
        }
    }

    pub fn is_open_for(&self, teacher_type: TeacherType, today: NaiveDate) -> bool {
        if !self.is_active {
            return false;
        }
        if self.teacher_type.is_some_and(|t| t != teacher_type) {
            return false;
        }
        if self.start_date.is_some_and(|start| today < start) {
            return false;
        }
        !self.end_date.is_some_and(|end| today > end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurveyAnswer {
    #[serde(default)]
    pub id: AnswerId,
    pub organization_id: OrganizationId,
    pub teacher_id: TeacherId,
    pub question_id: QuestionId,
    pub answer: u32,
    /// Back-filled once the call commits its report.
    #[serde(default)]
    pub report_id: Option<ReportId>,
    #[serde(default = "Utc::now")]
    pub answered_at: DateTime<Utc>,
}
