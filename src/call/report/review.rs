use super::commit::summarize;
use super::date::display_date;
use super::fields::month_bounds;
use super::state::{FlowStep, ReviewState};
use super::ReportFlow;
use crate::call::app::{AppAction, ApplicationContext, CallController, InputConstraints};
use crate::error::FlowError;
use crate::models::ReportFields;
use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, Utc};
use tracing::{debug, info};

/// Year of `month` as seen from `today`: months still ahead belong to last
/// year.
fn review_year(month: u32, today: NaiveDate) -> i32 {
    if month > today.month() {
        today.year() - 1
    } else {
        today.year()
    }
}

impl ReportFlow {
    pub(super) fn choose_month(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> AppAction {
        self.state.step = FlowStep::ChooseMonth;
        ctrl.ask_for_input(ctx.text("choose_month"), InputConstraints::digits(1, 2))
    }

    pub(super) async fn on_choose_month(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let today = ctx.today();
        let bounds = digits
            .parse::<u32>()
            .ok()
            .filter(|m| (1..=12).contains(m))
            .and_then(|m| NaiveDate::from_ymd_opt(review_year(m, today), m, 1))
            .and_then(month_bounds);
        let Some((first, last)) = bounds else {
            ctrl.send_message(ctx.text("month_invalid"));
            return Ok(self.choose_month(ctrl, ctx));
        };

        let teacher_id = self.teacher()?.id;
        let reports: Vec<_> = ctx
            .store
            .find_reports_between(ctx.organization.id, teacher_id, first, last)
            .await?
            .into_iter()
            .filter(|r| !r.is_locked())
            .collect();
        info!(%first, %last, count = reports.len(), "reviewing reports");
        if reports.is_empty() {
            return Ok(ctrl.hangup_with_message(ctx.text("no_reports_to_review")));
        }
        self.state.review = Some(ReviewState { reports, index: 0 });
        self.present_review_report(ctrl, ctx)
    }

    fn present_review_report(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let Some(report) = self.state.review.as_ref().and_then(|r| r.current()) else {
            return Ok(ctrl.hangup_with_message(ctx.text("review_done")));
        };
        let keys = self
            .state
            .flow()
            .map(|f| f.relevant_fields())
            .unwrap_or_default();
        let summary = summarize(ctx, keys, &report.fields, None);
        let prompt = ctx.text_with(
            "review_report",
            &[
                ("date", display_date(report.report_date)),
                ("summary", summary),
            ],
        );
        self.state.step = FlowStep::ReviewReport;
        Ok(ctrl.ask_for_menu(prompt, &['1', '2']))
    }

    pub(super) fn next_review_report(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        self.state.report_date = None;
        self.state.replaces.clear();
        self.state.fields = ReportFields::default();
        if let Some(review) = self.state.review.as_mut() {
            review.index += 1;
        }
        self.present_review_report(ctrl, ctx)
    }

    pub(super) async fn on_review_report(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let report = self
            .state
            .review
            .as_ref()
            .and_then(|r| r.current())
            .cloned()
            .ok_or_else(|| anyhow!("no report under review"))?;

        if digits == "1" {
            let mut confirmed = report;
            confirmed.is_confirmed = true;
            confirmed.update_date = Utc::now();
            let confirmed = ctx
                .store
                .save_report(confirmed)
                .await
                .map_err(FlowError::SaveFailed)?;
            debug!(report = confirmed.id, "report confirmed as-is");
            ctrl.send_message(ctx.text("report_confirmed"));
            return self.next_review_report(ctrl, ctx);
        }

        debug!(report = report.id, "report reopened for correction");
        self.state.report_date = Some(report.report_date);
        self.state.replaces = vec![report];
        self.begin_fields(ctrl, ctx).await
    }
}
