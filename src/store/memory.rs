use super::{CommitRequest, ReportStore, StoreFixtures};
use crate::models::{
    AnswerId, AttendanceReport, Organization, OrganizationId, Question, ReportId, SurveyAnswer,
    Teacher, TeacherId, TeacherType, WorkingDate,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// In-memory store, optionally mirrored to a JSON snapshot after every write.
pub struct MemoryStore {
    data: Mutex<StoreFixtures>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new(fixtures: StoreFixtures) -> Self {
        Self {
            data: Mutex::new(fixtures),
            snapshot: None,
        }
    }

    /// Mirrors every write to `path`. Nothing is read from it.
    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    /// Loads the snapshot when it exists, otherwise the fixtures file.
    pub async fn open(fixtures: Option<&str>, snapshot: Option<&str>) -> Result<Self> {
        if let Some(path) = snapshot {
            let path = PathBuf::from(path);
            if path.exists() {
                let content = tokio::fs::read_to_string(&path).await?;
                let data: StoreFixtures = serde_json::from_str(&content).map_err(|e| {
                    anyhow::anyhow!("Failed to parse snapshot '{}': {}", path.display(), e)
                })?;
                info!(
                    path = %path.display(),
                    reports = data.reports.len(),
                    answers = data.answers.len(),
                    "loaded store snapshot"
                );
                return Ok(Self {
                    data: Mutex::new(data),
                    snapshot: Some(path),
                });
            }
        }
        let data = match fixtures {
            Some(path) => {
                let data = StoreFixtures::load(path)?;
                info!(
                    path,
                    organizations = data.organizations.len(),
                    teachers = data.teachers.len(),
                    "loaded store fixtures"
                );
                data
            }
            None => {
                warn!("no fixtures configured, starting with an empty store");
                StoreFixtures::default()
            }
        };
        let snapshot = snapshot.map(PathBuf::from);
        if let Some(dir) = snapshot.as_deref().and_then(Path::parent) {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        Ok(Self {
            data: Mutex::new(data),
            snapshot,
        })
    }

    pub async fn reports(&self) -> Vec<AttendanceReport> {
        self.data.lock().await.reports.clone()
    }

    pub async fn answers(&self) -> Vec<SurveyAnswer> {
        self.data.lock().await.answers.clone()
    }

    async fn persist(&self, data: &StoreFixtures) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };
        write_snapshot(path, data).await
    }
}

async fn write_snapshot(path: &Path, data: &StoreFixtures) -> Result<()> {
    let content = serde_json::to_string_pretty(data)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, content).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn next_report_id(data: &StoreFixtures) -> ReportId {
    data.reports.iter().map(|r| r.id).max().unwrap_or(0) + 1
}

fn next_answer_id(data: &StoreFixtures) -> AnswerId {
    data.answers.iter().map(|a| a.id).max().unwrap_or(0) + 1
}

fn upsert_report(data: &mut StoreFixtures, mut report: AttendanceReport) -> AttendanceReport {
    report.update_date = Utc::now();
    if report.id == 0 {
        report.id = next_report_id(data);
        data.reports.push(report.clone());
    } else if let Some(existing) = data.reports.iter_mut().find(|r| r.id == report.id) {
        *existing = report.clone();
    } else {
        data.reports.push(report.clone());
    }
    report
}

fn relink(data: &mut StoreFixtures, from: ReportId, to: ReportId) -> usize {
    let mut moved = 0;
    for answer in data.answers.iter_mut() {
        if answer.report_id == Some(from) {
            answer.report_id = Some(to);
            moved += 1;
        }
    }
    moved
}

fn link(data: &mut StoreFixtures, ids: &[AnswerId], report_id: ReportId) -> usize {
    let mut linked = 0;
    for answer in data.answers.iter_mut() {
        if answer.report_id.is_none() && ids.contains(&answer.id) {
            answer.report_id = Some(report_id);
            linked += 1;
        }
    }
    linked
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn find_organization_by_line(&self, line: &str) -> Result<Option<Organization>> {
        let data = self.data.lock().await;
        Ok(data.organizations.iter().find(|o| o.line == line).cloned())
    }

    async fn find_teacher_by_phone(
        &self,
        organization_id: OrganizationId,
        phone: &str,
    ) -> Result<Option<Teacher>> {
        let data = self.data.lock().await;
        Ok(data
            .teachers
            .iter()
            .find(|t| t.organization_id == organization_id && t.has_phone(phone))
            .cloned())
    }

    async fn find_teachers_by_phone_suffix(
        &self,
        organization_id: OrganizationId,
        suffix: &str,
    ) -> Result<Vec<Teacher>> {
        let data = self.data.lock().await;
        Ok(data
            .teachers
            .iter()
            .filter(|t| t.organization_id == organization_id && t.phone_ends_with(suffix))
            .cloned()
            .collect())
    }

    async fn find_working_date(
        &self,
        organization_id: OrganizationId,
        teacher_type: TeacherType,
        date: NaiveDate,
    ) -> Result<Option<WorkingDate>> {
        let data = self.data.lock().await;
        Ok(data
            .working_dates
            .iter()
            .find(|w| {
                w.organization_id == organization_id
                    && w.teacher_type == teacher_type
                    && w.date == date
            })
            .cloned())
    }

    async fn find_reports(
        &self,
        organization_id: OrganizationId,
        teacher_id: TeacherId,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceReport>> {
        self.find_reports_between(organization_id, teacher_id, date, date)
            .await
    }

    async fn find_reports_between(
        &self,
        organization_id: OrganizationId,
        teacher_id: TeacherId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceReport>> {
        let data = self.data.lock().await;
        let mut reports: Vec<AttendanceReport> = data
            .reports
            .iter()
            .filter(|r| {
                r.organization_id == organization_id
                    && r.teacher_id == teacher_id
                    && r.report_date >= from
                    && r.report_date <= to
            })
            .cloned()
            .collect();
        reports.sort_by_key(|r| (r.report_date, r.id));
        Ok(reports)
    }

    async fn save_report(&self, report: AttendanceReport) -> Result<AttendanceReport> {
        let mut data = self.data.lock().await;
        let saved = upsert_report(&mut data, report);
        self.persist(&data).await?;
        Ok(saved)
    }

    async fn delete_report(&self, id: ReportId) -> Result<()> {
        let mut data = self.data.lock().await;
        data.reports.retain(|r| r.id != id);
        self.persist(&data).await
    }

    async fn relink_answers(&self, from: ReportId, to: ReportId) -> Result<usize> {
        let mut data = self.data.lock().await;
        let moved = relink(&mut data, from, to);
        self.persist(&data).await?;
        Ok(moved)
    }

    async fn link_answers(&self, ids: &[AnswerId], report_id: ReportId) -> Result<usize> {
        let mut data = self.data.lock().await;
        let linked = link(&mut data, ids, report_id);
        self.persist(&data).await?;
        Ok(linked)
    }

    async fn find_active_questions(
        &self,
        organization_id: OrganizationId,
        teacher_type: TeacherType,
        today: NaiveDate,
    ) -> Result<Vec<Question>> {
        let data = self.data.lock().await;
        let mut questions: Vec<Question> = data
            .questions
            .iter()
            .filter(|q| q.organization_id == organization_id && q.is_open_for(teacher_type, today))
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.id);
        Ok(questions)
    }

    async fn find_answers(
        &self,
        organization_id: OrganizationId,
        teacher_id: TeacherId,
    ) -> Result<Vec<SurveyAnswer>> {
        let data = self.data.lock().await;
        Ok(data
            .answers
            .iter()
            .filter(|a| a.organization_id == organization_id && a.teacher_id == teacher_id)
            .cloned()
            .collect())
    }

    async fn save_answer(&self, mut answer: SurveyAnswer) -> Result<SurveyAnswer> {
        let mut data = self.data.lock().await;
        if answer.id == 0 {
            answer.id = next_answer_id(&data);
        }
        data.answers.retain(|a| a.id != answer.id);
        data.answers.push(answer.clone());
        self.persist(&data).await?;
        Ok(answer)
    }

    async fn commit_report(&self, request: CommitRequest) -> Result<AttendanceReport> {
        let mut data = self.data.lock().await;
        // work on a copy so a failed snapshot write leaves the store untouched
        let mut next = data.clone();
        let saved = upsert_report(&mut next, request.report);
        next.reports
            .retain(|r| r.id == saved.id || !request.replaces.contains(&r.id));
        for old_id in request.replaces {
            relink(&mut next, old_id, saved.id);
        }
        link(&mut next, &request.answer_ids, saved.id);
        self.persist(&next).await?;
        *data = next;
        Ok(saved)
    }
}
