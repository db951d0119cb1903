use super::fields::Continuation;
use super::state::FlowStep;
use super::{is_yes, ReportFlow};
use crate::call::app::{AppAction, ApplicationContext, CallController};
use anyhow::Result;
use tracing::debug;

impl ReportFlow {
    fn continuation(&self) -> Continuation {
        self.state
            .flow()
            .map(|f| f.continuation(self.state.mode()))
            .unwrap_or(Continuation::None)
    }

    pub(super) fn offer_continuation(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> AppAction {
        let key = match self.continuation() {
            Continuation::None => return ctrl.hangup_with_message(ctx.text("goodbye")),
            Continuation::AnotherDate => "offer_another_date",
            Continuation::AnotherTeacher => "offer_another_teacher",
        };
        self.state.step = FlowStep::Continuation;
        ctrl.ask_confirmation(ctx.text(key))
    }

    pub(super) async fn on_continuation(
        &mut self,
        digits: &str,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        if !is_yes(digits) {
            return Ok(ctrl.hangup_with_message(ctx.text("goodbye")));
        }
        let continuation = self.continuation();
        debug!(?continuation, "caller continues");
        self.state.reset_date();
        if continuation == Continuation::AnotherTeacher {
            self.state.other_teacher = None;
            self.state.other_candidates.clear();
            self.state.reporting_on_other = Some(true);
        }
        self.choose_mode(ctrl, ctx).await
    }
}
