//! The attendance reporting call flow.
//!
//! A call walks through identification, pending survey questions, date
//! selection, the teacher type's field prompts and a read-back before the
//! report is saved. Each step lives in its own file as an `impl ReportFlow`
//! block; [`CallApp::on_input`] dispatches on the step that issued the
//! outstanding read.

use crate::call::app::{AppAction, ApplicationContext, CallApp, CallController, ExitReason};
use crate::models::Teacher;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::info;

mod commit;
mod continuation;
mod date;
mod fields;
mod gate;
mod questions;
mod review;
mod state;

pub use date::parse_date_digits;
pub use fields::{
    Continuation, FieldPrompt, ReportMode, TeacherTypeFlow, MAX_MONTHLY_ABSENCES,
};
pub use state::{CallState, FlowStep, ReviewState};

/// `1` is yes on every confirmation prompt.
pub(crate) fn is_yes(digits: &str) -> bool {
    digits == "1"
}

#[derive(Debug, Default)]
pub struct ReportFlow {
    state: CallState,
}

impl ReportFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &CallState {
        &self.state
    }

    fn teacher(&self) -> Result<&Teacher> {
        self.state
            .teacher
            .as_ref()
            .ok_or_else(|| anyhow!("teacher not identified yet"))
    }
}

#[async_trait]
impl CallApp for ReportFlow {
    fn name(&self) -> &str {
        "teacher-report"
    }

    fn current_step(&self) -> String {
        self.state.step.to_string()
    }

    async fn on_enter(
        &mut self,
        controller: &mut CallController,
        context: &ApplicationContext,
    ) -> Result<AppAction> {
        self.start(controller, context).await
    }

    async fn on_input(
        &mut self,
        digits: String,
        controller: &mut CallController,
        context: &ApplicationContext,
    ) -> Result<AppAction> {
        let (ctrl, ctx) = (controller, context);
        match self.state.step {
            FlowStep::Question => self.on_question_answer(&digits, ctrl, ctx).await,
            FlowStep::ChooseMode => self.on_choose_mode(&digits, ctrl, ctx).await,
            FlowStep::EnterDate => self.on_date_digits(&digits, ctrl, ctx).await,
            FlowStep::ConfirmDate => self.on_confirm_date(&digits, ctrl, ctx).await,
            FlowStep::ReportMode => self.on_report_mode(&digits, ctrl, ctx).await,
            FlowStep::OtherTeacherPhone => self.on_other_teacher_phone(&digits, ctrl, ctx).await,
            FlowStep::SelectOtherTeacher => self.on_select_other_teacher(&digits, ctrl, ctx).await,
            FlowStep::ConfirmOtherTeacher => {
                self.on_confirm_other_teacher(&digits, ctrl, ctx).await
            }
            FlowStep::Field(index) => self.on_field(index, &digits, ctrl, ctx).await,
            FlowStep::ConfirmReport => self.on_confirm_report(&digits, ctrl, ctx).await,
            FlowStep::Continuation => self.on_continuation(&digits, ctrl, ctx).await,
            FlowStep::ChooseMonth => self.on_choose_month(&digits, ctrl, ctx).await,
            FlowStep::ReviewReport => self.on_review_report(&digits, ctrl, ctx).await,
            step @ (FlowStep::Start | FlowStep::Done) => {
                Err(anyhow!("no input expected in step {}", step))
            }
        }
    }

    async fn on_exit(&mut self, reason: ExitReason) -> Result<()> {
        info!(
            teacher = ?self.state.teacher.as_ref().map(|t| t.id),
            step = %self.state.step,
            %reason,
            "report flow finished"
        );
        self.state.step = FlowStep::Done;
        Ok(())
    }
}
