use super::ReportFlow;
use crate::call::app::{AppAction, ApplicationContext, CallController};
use crate::error::FlowError;
use anyhow::Result;
use tracing::info;

impl ReportFlow {
    /// First turn: maintenance and celebration short-circuits, then caller
    /// identification.
    pub(super) async fn start(
        &mut self,
        ctrl: &mut CallController,
        ctx: &ApplicationContext,
    ) -> Result<AppAction> {
        let organization = &ctx.organization;
        if organization.maintenance {
            info!(organization = organization.id, "line in maintenance");
            let message = match organization.maintenance_message.as_deref() {
                Some(message) if !message.trim().is_empty() => message.to_string(),
                _ => ctx.text("maintenance"),
            };
            return Ok(ctrl.hangup_with_message(message));
        }

        if let (Some(celebrations), Some(entry)) =
            (&ctx.config.celebrations, &ctx.call_info.entry_digits)
        {
            if *entry == celebrations.code {
                info!(transfer_to = %celebrations.target, "transferring to celebrations line");
                return Ok(AppAction::Transfer(celebrations.target.clone()));
            }
        }

        let caller = ctx.call_info.caller.as_str();
        let Some(teacher) = ctx
            .store
            .find_teacher_by_phone(organization.id, caller)
            .await?
        else {
            return Err(FlowError::UnknownCaller(caller.to_string()).into());
        };

        info!(
            teacher = teacher.id,
            teacher_type = %teacher.teacher_type,
            "caller identified"
        );
        ctrl.send_message(ctx.text_with("welcome", &[("name", teacher.name.clone())]));
        self.state.teacher = Some(teacher);
        self.begin_questions(ctrl, ctx).await
    }
}
