use super::state::FlowStep;
use super::{is_yes, ReportFlow};
use crate::call::app::{AppAction, ApplicationContext, CallController, InputConstraints};
use crate::models::TeacherType;
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

/// Parses `DDMMYYYY`, `DDMMYY` (20YY) or `DDMM` (in `current_year`).
pub fn parse_date_digits(digits: &str, current_year: i32) -> Option<NaiveDate> {
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let day: u32 = digits.get(0..2)?.parse().ok()?;
    let month: u32 = digits.get(2..4)?.parse().ok()?;
    let year = match digits.len() {
        4 => current_year,
        6 => 2000 + digits.get(4..6)?.parse::<i32>().ok()?,
        8 => digits.get(4..8)?.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Renders a date the way it is read back to the caller.
pub(super) fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

impl ReportFlow {
    pub(super) async fn choose_mode(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        self.state.step = FlowStep::ChooseMode;
        if self.teacher()?.teacher_type == TeacherType::Manha {
            Ok(ctrl.ask_for_menu(ctx.text("choose_date_mode_manha"), &['1', '2']))
        } else {
            Ok(ctrl.ask_for_menu(ctx.text("choose_date_mode"), &['1', '2', '3']))
        }
    }

    pub(super) async fn on_choose_mode(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        match digits {
            "1" => self.accept_date_candidate(ctx.today(), ctrl, ctx).await,
            "3" => Ok(self.choose_month(ctrl, ctx)),
            _ => Ok(self.ask_date(ctrl, ctx)),
        }
    }

    pub(super) fn ask_date(&mut self, ctrl: &mut CallController, ctx: &ApplicationContext) -> AppAction {
        self.state.reset_date();
        self.state.step = FlowStep::EnterDate;
        ctrl.ask_for_input(ctx.text("enter_date"), InputConstraints::digits(4, 8))
    }

    pub(super) async fn on_date_digits(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        match parse_date_digits(digits, ctx.today().year()) {
            Some(date) => self.accept_date_candidate(date, ctrl, ctx).await,
            None => {
                debug!(digits, "unparseable date");
                ctrl.send_message(ctx.text("date_invalid"));
                Ok(self.ask_date(ctrl, ctx))
            }
        }
    }

    /// Runs the date checks in order. Any failure is announced and the
    /// caller is asked for a date again.
    async fn accept_date_candidate(
        &mut self,
        date: NaiveDate,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let teacher = self.teacher()?.clone();

        if date > ctx.today() {
            ctrl.send_message(ctx.text("date_future"));
            return Ok(self.ask_date(ctrl, ctx));
        }

        let working = ctx
            .store
            .find_working_date(ctx.organization.id, teacher.teacher_type, date)
            .await?;
        if working.is_none() {
            let key = format!("date_not_working_{}", teacher.teacher_type.code());
            ctrl.send_message(ctx.text_or(&key, "date_not_working"));
            return Ok(self.ask_date(ctrl, ctx));
        }

        let mut replaces = Vec::new();
        if !teacher.teacher_type.reports_on_others() {
            let relevant = self
                .state
                .flow()
                .map(|f| f.relevant_fields())
                .unwrap_or_default();
            let existing: Vec<_> = ctx
                .store
                .find_reports(ctx.organization.id, teacher.id, date)
                .await?
                .into_iter()
                .filter(|r| r.fields.any_set(&relevant))
                .collect();
            if existing.iter().any(|r| r.is_locked()) {
                info!(%date, "date already has a locked report");
                ctrl.send_message(ctx.text("date_locked"));
                return Ok(self.ask_date(ctrl, ctx));
            }
            if !existing.is_empty() {
                debug!(%date, count = existing.len(), "existing reports will be replaced");
                ctrl.send_message(ctx.text("report_will_be_overwritten"));
                replaces = existing;
            }
        }

        self.state.report_date = Some(date);
        self.state.replaces = replaces;
        self.state.step = FlowStep::ConfirmDate;
        let weekday = ctx.text(&format!("weekday_{}", date.weekday().num_days_from_sunday()));
        Ok(ctrl.ask_confirmation(ctx.text_with(
            "confirm_date",
            &[("weekday", weekday), ("date", display_date(date))],
        )))
    }

    pub(super) async fn on_confirm_date(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        if is_yes(digits) {
            debug!(date = ?self.state.report_date, "date confirmed");
            self.begin_fields(ctrl, ctx).await
        } else {
            Ok(self.ask_date(ctrl, ctx))
        }
    }
}
