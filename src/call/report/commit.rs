use super::state::FlowStep;
use super::{is_yes, ReportFlow};
use crate::call::app::{AppAction, ApplicationContext, CallController};
use crate::error::FlowError;
use crate::models::{AttendanceReport, FieldKey, FieldValue, ReportFields};
use crate::store::CommitRequest;
use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::info;

/// Spoken summary of the set fields, in prompt order.
pub(super) fn summarize(
    ctx: &ApplicationContext,
    keys: impl IntoIterator<Item = FieldKey>,
    fields: &ReportFields,
    other_teacher: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    if let Some(name) = other_teacher {
        parts.push(ctx.text_with("summary_other_teacher", &[("name", name.to_string())]));
    }
    for key in keys {
        let value = match fields.get(key) {
            Some(FieldValue::Number(n)) => n.to_string(),
            Some(FieldValue::Flag(true)) => ctx.text("yes"),
            Some(FieldValue::Flag(false)) => ctx.text("no"),
            None => continue,
        };
        parts.push(ctx.text_with(&format!("summary_{}", key), &[("value", value)]));
    }
    if fields.is_empty() {
        parts.push(ctx.text("summary_empty"));
    }
    parts.join(" ")
}

impl ReportFlow {
    pub(super) fn confirm_report(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> AppAction {
        let keys = self.state.prompts().iter().map(|p| p.key);
        let other = self.state.other_teacher.as_ref().map(|t| t.name.as_str());
        let summary = summarize(ctx, keys, &self.state.fields, other);
        self.state.step = FlowStep::ConfirmReport;
        ctrl.ask_confirmation(ctx.text_with("confirm_report", &[("summary", summary)]))
    }

    pub(super) async fn on_confirm_report(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        if !is_yes(digits) {
            ctrl.send_message(ctx.text("report_discarded"));
            self.state.discard_attempt();
            return self.begin_fields(ctrl, ctx).await;
        }

        let saved = self.commit(ctx).await?;
        info!(report = saved.id, date = %saved.report_date, "report committed");
        ctrl.send_message(ctx.text("report_saved"));

        if self.state.review.is_some() {
            return self.next_review_report(ctrl, ctx);
        }
        self.state.fields = ReportFields::default();
        self.state.replaces.clear();
        Ok(self.offer_continuation(ctrl, ctx))
    }

    async fn commit(&mut self, ctx: &ApplicationContext) -> Result<AttendanceReport> {
        let teacher_id = self.teacher()?.id;
        let date = self
            .state
            .report_date
            .ok_or_else(|| anyhow!("commit without a report date"))?;

        let mut report = AttendanceReport::new(ctx.organization.id, teacher_id, date);
        // The caller accepted the summary, so the report is locked from here on.
        report.is_confirmed = true;
        report.other_teacher_id = self.state.other_teacher.as_ref().map(|t| t.id);
        report.update_date = Utc::now();
        report.fields = self.state.fields.clone();

        let request = CommitRequest {
            report,
            replaces: self.state.replaces.iter().map(|r| r.id).collect(),
            answer_ids: self.state.answer_ids.clone(),
        };
        let saved = ctx
            .store
            .commit_report(request)
            .await
            .map_err(FlowError::SaveFailed)?;
        self.state.answer_ids.clear();
        Ok(saved)
    }
}
