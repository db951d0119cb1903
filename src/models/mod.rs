//! Durable entities read and written by the reporting call flow.
//!
//! The shapes here cover only what the telephone flow touches; the admin
//! side owns the full schema.

pub mod organization;
pub mod question;
pub mod report;
pub mod teacher;
pub mod working_date;

pub use organization::Organization;
pub use question::{Question, SurveyAnswer};
pub use report::{AttendanceReport, FieldKey, FieldValue, ReportFields};
pub use teacher::{Teacher, TeacherType};
pub use working_date::WorkingDate;

pub type OrganizationId = u64;
pub type TeacherId = u64;
pub type ReportId = u64;
pub type QuestionId = u64;
pub type AnswerId = u64;
