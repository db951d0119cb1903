//! Persistence seam for the reporting flow.
//!
//! The call flow only ever talks to [`ReportStore`]; the relational schema
//! behind it belongs to the admin application. [`MemoryStore`] backs the
//! service in standalone deployments and in tests.

use crate::config::StoreConfig;
use crate::models::{
    AnswerId, AttendanceReport, Organization, OrganizationId, Question, ReportId, SurveyAnswer,
    Teacher, TeacherId, TeacherType, WorkingDate,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod memory;

pub use memory::MemoryStore;

/// Everything the commit step writes in one go.
#[derive(Debug, Clone)]
pub struct CommitRequest {
    pub report: AttendanceReport,
    /// Unconfirmed reports being superseded; deleted after the new one is saved.
    pub replaces: Vec<ReportId>,
    /// Answers collected earlier in the same call, still unlinked.
    pub answer_ids: Vec<AnswerId>,
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_organization_by_line(&self, line: &str) -> Result<Option<Organization>>;

    async fn find_teacher_by_phone(
        &self,
        organization_id: OrganizationId,
        phone: &str,
    ) -> Result<Option<Teacher>>;

    async fn find_teachers_by_phone_suffix(
        &self,
        organization_id: OrganizationId,
        suffix: &str,
    ) -> Result<Vec<Teacher>>;

    async fn find_working_date(
        &self,
        organization_id: OrganizationId,
        teacher_type: TeacherType,
        date: NaiveDate,
    ) -> Result<Option<WorkingDate>>;

    async fn find_reports(
        &self,
        organization_id: OrganizationId,
        teacher_id: TeacherId,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceReport>>;

    /// Reports with `from <= report_date <= to`, ordered by date.
    async fn find_reports_between(
        &self,
        organization_id: OrganizationId,
        teacher_id: TeacherId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceReport>>;

    /// Inserts when `report.id == 0`, otherwise overwrites the stored row.
    async fn save_report(&self, report: AttendanceReport) -> Result<AttendanceReport>;

    async fn delete_report(&self, id: ReportId) -> Result<()>;

    /// Moves every answer linked to `from` onto `to`. Returns the number moved.
    async fn relink_answers(&self, from: ReportId, to: ReportId) -> Result<usize>;

    /// Links the given answers to `report_id` if they are still unlinked.
    async fn link_answers(&self, ids: &[AnswerId], report_id: ReportId) -> Result<usize>;

    async fn find_active_questions(
        &self,
        organization_id: OrganizationId,
        teacher_type: TeacherType,
        today: NaiveDate,
    ) -> Result<Vec<Question>>;

    async fn find_answers(
        &self,
        organization_id: OrganizationId,
        teacher_id: TeacherId,
    ) -> Result<Vec<SurveyAnswer>>;

    async fn save_answer(&self, answer: SurveyAnswer) -> Result<SurveyAnswer>;

    /// Saves the new report, drops the superseded ones, and moves answers over.
    ///
    /// This default runs the steps one after another; stores with real
    /// transactions should override it.
    async fn commit_report(&self, request: CommitRequest) -> Result<AttendanceReport> {
        let saved = self.save_report(request.report).await?;
        for old_id in request.replaces {
            self.delete_report(old_id).await?;
            self.relink_answers(old_id, saved.id).await?;
        }
        if !request.answer_ids.is_empty() {
            self.link_answers(&request.answer_ids, saved.id).await?;
        }
        Ok(saved)
    }
}

/// Seed data, loaded from TOML. Dates are written as `"YYYY-MM-DD"` strings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreFixtures {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub working_dates: Vec<WorkingDate>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub reports: Vec<AttendanceReport>,
    #[serde(default)]
    pub answers: Vec<SurveyAnswer>,
}

impl StoreFixtures {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read fixtures '{}': {}", path, e))?;
        let fixtures = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse fixtures '{}': {}", path, e))?;
        Ok(fixtures)
    }
}

pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn ReportStore>> {
    match config {
        StoreConfig::Memory { fixtures, snapshot } => {
            let store = MemoryStore::open(fixtures.as_deref(), snapshot.as_deref()).await?;
            Ok(Arc::new(store))
        }
    }
}
