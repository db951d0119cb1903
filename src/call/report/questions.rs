use super::state::FlowStep;
use super::ReportFlow;
use crate::call::app::{AppAction, ApplicationContext, CallController, InputConstraints};
use crate::error::FlowError;
use crate::models::{AttendanceReport, SurveyAnswer};
use crate::store::CommitRequest;
use anyhow::{anyhow, Result};
use chrono::Utc;
use std::collections::HashSet;
use tracing::{debug, info};

impl ReportFlow {
    /// Loads the questions this teacher has not answered yet and asks the
    /// first one, or goes straight to date selection.
    pub(super) async fn begin_questions(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let teacher = self.teacher()?.clone();
        let questions = ctx
            .store
            .find_active_questions(ctx.organization.id, teacher.teacher_type, ctx.today())
            .await?;
        let answered: HashSet<_> = ctx
            .store
            .find_answers(ctx.organization.id, teacher.id)
            .await?
            .into_iter()
            .map(|a| a.question_id)
            .collect();

        self.state.questions = questions
            .into_iter()
            .filter(|q| q.is_open_for(teacher.teacher_type, ctx.today()))
            .filter(|q| !answered.contains(&q.id))
            .collect();
        debug!(pending = self.state.questions.len(), "survey questions loaded");
        self.next_question(ctrl, ctx).await
    }

    async fn next_question(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        match self.state.questions.first() {
            Some(question) => {
                self.state.step = FlowStep::Question;
                Ok(ctrl.ask_for_input(
                    question.content.clone(),
                    InputConstraints::one_of(question.allowed_digits()),
                ))
            }
            None => self.choose_mode(ctrl, ctx).await,
        }
    }

    pub(super) async fn on_question_answer(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        if self.state.questions.is_empty() {
            return Err(anyhow!("answer received with no question pending"));
        }
        let question = self.state.questions.remove(0);
        let teacher_id = self.teacher()?.id;
        let answer = SurveyAnswer {
            id: 0,
            organization_id: ctx.organization.id,
            teacher_id,
            question_id: question.id,
            answer: digits.parse()?,
            report_id: None,
            answered_at: Utc::now(),
        };

        let saved = ctx
            .store
            .save_answer(answer)
            .await
            .map_err(FlowError::SaveFailed)?;
        debug!(question = question.id, answer = saved.id, "survey answer saved");
        self.state.answer_ids.push(saved.id);

        if question.is_standalone {
            // Every answer of this call is anchored to an empty confirmed
            // report for today.
            let mut report = AttendanceReport::new(ctx.organization.id, teacher_id, ctx.today());
            report.is_confirmed = true;
            let request = CommitRequest {
                report,
                replaces: Vec::new(),
                answer_ids: std::mem::take(&mut self.state.answer_ids),
            };
            let report = ctx
                .store
                .commit_report(request)
                .await
                .map_err(FlowError::SaveFailed)?;
            info!(question = question.id, report = report.id, "standalone question answered");
            return Ok(ctrl.hangup_with_message(ctx.text("standalone_thanks")));
        }

        self.next_question(ctrl, ctx).await
    }
}
