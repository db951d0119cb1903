use super::{
    AppAction, ApplicationContext, CallApp, CallController, CallInfo, ExitReason, PendingRead,
    TurnReply,
};
use crate::call::report::ReportFlow;
use crate::config::Config;
use crate::error::FlowError;
use crate::models::Organization;
use crate::store::ReportStore;
use crate::texts::TextStore;
use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

pub type ClockHook = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;
pub type AppFactory = Box<dyn Fn(&CallInfo) -> Box<dyn CallApp> + Send + Sync>;

/// One inbound webhook event.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TurnRequest {
    pub call_id: String,
    pub caller: String,
    pub called: String,
    #[serde(default)]
    pub digits: Option<String>,
    /// Set by the gateway when the caller has already disconnected.
    #[serde(default)]
    pub hangup: bool,
}

struct CallSession {
    info: CallInfo,
    organization: Organization,
    app: Box<dyn CallApp>,
    pending: Option<PendingRead>,
    updated_at: DateTime<Utc>,
    turns: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub call_id: String,
    pub caller: String,
    pub organization_id: u64,
    pub app: String,
    pub step: String,
    pub turns: u32,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Holds every live call and advances it by one step per inbound turn.
///
/// Sessions are independent: each sits behind its own lock, so a slow store
/// call on one line never holds up another. This is also the only place a
/// call is terminated because of an error.
pub struct CallSessionManager {
    store: Arc<dyn ReportStore>,
    texts: Arc<dyn TextStore>,
    config: Arc<Config>,
    tz: Tz,
    clock: ClockHook,
    factory: AppFactory,
    sessions: Mutex<HashMap<String, Arc<Mutex<CallSession>>>>,
}

impl CallSessionManager {
    pub fn new(
        store: Arc<dyn ReportStore>,
        texts: Arc<dyn TextStore>,
        config: Arc<Config>,
    ) -> Result<Self> {
        let tz = config.tz()?;
        Ok(Self {
            store,
            texts,
            config,
            tz,
            clock: Box::new(Utc::now),
            factory: Box::new(|_: &CallInfo| Box::new(ReportFlow::new()) as Box<dyn CallApp>),
            sessions: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_clock(mut self, clock: ClockHook) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_app_factory(mut self, factory: AppFactory) -> Self {
        self.factory = factory;
        self
    }

    pub async fn handle_turn(&self, request: TurnRequest) -> TurnReply {
        let now = (self.clock)();

        if request.hangup {
            if let Some(session) = self.remove(&request.call_id).await {
                let mut session = session.lock().await;
                info!(
                    call_id = %request.call_id,
                    step = %session.app.current_step(),
                    turns = session.turns,
                    "caller hung up"
                );
                if let Err(e) = session.app.on_exit(ExitReason::RemoteHangup).await {
                    warn!(call_id = %request.call_id, "on_exit failed: {}", e);
                }
            }
            return TurnReply::Hangup { messages: vec![] };
        }

        let session = match self.get_or_create(&request, now).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                warn!(call_id = %request.call_id, called = %request.called, "no organization for called line");
                return TurnReply::Hangup {
                    messages: vec![self.texts.get_text(0, "line_not_configured", &[])],
                };
            }
            Err(e) => {
                error!(call_id = %request.call_id, "failed to create session: {:?}", e);
                return TurnReply::Hangup {
                    messages: vec![self.texts.get_text(0, "system_error", &[])],
                };
            }
        };

        let mut session = session.lock().await;
        session.updated_at = now;
        session.turns += 1;

        let ctx = ApplicationContext {
            store: self.store.clone(),
            texts: self.texts.clone(),
            config: self.config.clone(),
            call_info: session.info.clone(),
            organization: session.organization.clone(),
            now: now.with_timezone(&self.tz),
        };
        let mut ctrl = CallController::new();

        let result = match session.pending.clone() {
            None => {
                info!(
                    call_id = %request.call_id,
                    caller = %request.caller,
                    organization = session.organization.id,
                    app = session.app.name(),
                    "call started"
                );
                session.app.on_enter(&mut ctrl, &ctx).await
            }
            Some(pending) => {
                let digits = request.digits.unwrap_or_default().trim().to_string();
                if !pending.constraints.accepts(&digits) {
                    debug!(
                        call_id = %request.call_id,
                        step = %session.app.current_step(),
                        digits = %digits,
                        "input rejected by constraints, repeating prompt"
                    );
                    ctrl.send_message(ctx.text("invalid_input"));
                    return TurnReply::Read {
                        messages: ctrl.take_messages(),
                        prompt: pending.prompt,
                        constraints: pending.constraints,
                    };
                }
                session.app.on_input(digits, &mut ctrl, &ctx).await
            }
        };

        self.finish_turn(&mut session, result, ctrl, &ctx).await
    }

    async fn finish_turn(
        &self,
        session: &mut CallSession,
        result: Result<AppAction>,
        mut ctrl: CallController,
        ctx: &ApplicationContext,
    ) -> TurnReply {
        let call_id = session.info.call_id.clone();
        match result {
            Ok(AppAction::Continue) => {
                if let Some(pending) = ctrl.take_pending() {
                    debug!(call_id = %call_id, step = %session.app.current_step(), "waiting for input");
                    session.pending = Some(pending.clone());
                    return TurnReply::Read {
                        messages: ctrl.take_messages(),
                        prompt: pending.prompt,
                        constraints: pending.constraints,
                    };
                }
                error!(
                    call_id = %call_id,
                    step = %session.app.current_step(),
                    "step ended without a prompt or hangup"
                );
                ctrl.send_message(ctx.text("system_error"));
                self.close(session, ExitReason::Error("no prompt".to_string()))
                    .await;
                TurnReply::Hangup {
                    messages: ctrl.take_messages(),
                }
            }
            Ok(AppAction::Hangup) => {
                info!(call_id = %call_id, turns = session.turns, "call finished");
                self.close(session, ExitReason::Hangup).await;
                TurnReply::Hangup {
                    messages: ctrl.take_messages(),
                }
            }
            Ok(AppAction::Transfer(target)) => {
                info!(call_id = %call_id, target = %target, "call transferred");
                self.close(session, ExitReason::Transferred).await;
                TurnReply::Transfer {
                    messages: ctrl.take_messages(),
                    target,
                }
            }
            Err(e) => {
                let key = match e.downcast_ref::<FlowError>() {
                    Some(flow_error) => {
                        if matches!(flow_error, FlowError::SaveFailed(_)) {
                            error!(call_id = %call_id, "{}", flow_error);
                        } else {
                            warn!(call_id = %call_id, "{}", flow_error);
                        }
                        flow_error.text_key()
                    }
                    None => {
                        error!(
                            call_id = %call_id,
                            step = %session.app.current_step(),
                            "call flow failed: {:?}",
                            e
                        );
                        "system_error"
                    }
                };
                ctrl.send_message(ctx.text(key));
                self.close(session, ExitReason::Error(e.to_string())).await;
                TurnReply::Hangup {
                    messages: ctrl.take_messages(),
                }
            }
        }
    }

    async fn close(&self, session: &mut CallSession, reason: ExitReason) {
        session.pending = None;
        if let Err(e) = session.app.on_exit(reason).await {
            warn!(call_id = %session.info.call_id, "on_exit failed: {}", e);
        }
        self.sessions.lock().await.remove(&session.info.call_id);
    }

    async fn get_or_create(
        &self,
        request: &TurnRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<Arc<Mutex<CallSession>>>> {
        if let Some(session) = self.sessions.lock().await.get(&request.call_id) {
            return Ok(Some(session.clone()));
        }

        let Some(organization) = self
            .store
            .find_organization_by_line(&request.called)
            .await?
        else {
            return Ok(None);
        };

        let info = CallInfo {
            call_id: request.call_id.clone(),
            caller: request.caller.clone(),
            called: request.called.clone(),
            entry_digits: request.digits.clone().filter(|d| !d.is_empty()),
            started_at: now,
        };
        let session = Arc::new(Mutex::new(CallSession {
            app: (self.factory)(&info),
            info,
            organization,
            pending: None,
            updated_at: now,
            turns: 0,
        }));

        let mut sessions = self.sessions.lock().await;
        // a concurrent first turn for the same call may have got here first
        Ok(Some(
            sessions
                .entry(request.call_id.clone())
                .or_insert(session)
                .clone(),
        ))
    }

    async fn remove(&self, call_id: &str) -> Option<Arc<Mutex<CallSession>>> {
        self.sessions.lock().await.remove(call_id)
    }

    /// Drops a session without playing anything. Returns whether it existed.
    pub async fn kill(&self, call_id: &str) -> bool {
        match self.remove(call_id).await {
            Some(session) => {
                let mut session = session.lock().await;
                if let Err(e) = session.app.on_exit(ExitReason::Cancelled).await {
                    warn!(call_id, "on_exit failed: {}", e);
                }
                info!(call_id, "session killed");
                true
            }
            None => false,
        }
    }

    /// Drops sessions idle for longer than `max_idle`. Busy sessions are left
    /// alone until the next sweep.
    pub async fn prune_idle(&self, max_idle: Duration) -> usize {
        let now = (self.clock)();
        let max_idle = chrono::Duration::from_std(max_idle).unwrap_or(chrono::Duration::MAX);
        let mut expired = Vec::new();
        {
            let mut sessions = self.sessions.lock().await;
            sessions.retain(|call_id, session| match session.try_lock() {
                Ok(s) if now - s.updated_at > max_idle => {
                    expired.push((call_id.clone(), session.clone()));
                    false
                }
                _ => true,
            });
        }
        for (call_id, session) in &expired {
            let mut session = session.lock().await;
            if let Err(e) = session.app.on_exit(ExitReason::Cancelled).await {
                warn!(call_id = %call_id, "on_exit failed: {}", e);
            }
            info!(call_id = %call_id, turns = session.turns, "idle session dropped");
        }
        expired.len()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Mutex<CallSession>>> =
            self.sessions.lock().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let session = session.lock().await;
            summaries.push(SessionSummary {
                call_id: session.info.call_id.clone(),
                caller: session.info.caller.clone(),
                organization_id: session.organization.id,
                app: session.app.name().to_string(),
                step: session.app.current_step(),
                turns: session.turns,
                started_at: session.info.started_at,
                updated_at: session.updated_at,
            });
        }
        summaries.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        summaries
    }
}
