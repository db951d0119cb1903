//! # Call Application Framework
//!
//! Turn-based driver for keypad call flows behind a webhook gateway.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │ Application Layer                                    │
//! │  ReportFlow ─ implements CallApp                     │
//! └─────────────────────────────────────────────────────┘
//!                          ▲
//! ┌─────────────────────────────────────────────────────┐
//! │ Call Application Framework                           │
//! │  CallSessionManager ─ one step per inbound turn      │
//! │  CallController ─ read / message / hangup primitives │
//! │  ApplicationContext ─ store, texts, clock            │
//! └─────────────────────────────────────────────────────┘
//!                          ▲ TurnRequest / TurnReply
//! ┌─────────────────────────────────────────────────────┐
//! │ Webhook handler (axum)                               │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! 1. The first turn of a call creates a session and calls `on_enter()`
//! 2. The app ends every step with a read (`AppAction::Continue`), a hangup
//!    or a transfer
//! 3. The next turn's digits are checked against the pending read's
//!    constraints and, if they pass, delivered to `on_input()`
//! 4. A hangup, transfer, remote hangup or error drops the session and
//!    calls `on_exit()`
//!
//! Between turns the app object simply sits in the session table; nothing
//! blocks while the caller is thinking.

use async_trait::async_trait;
use std::fmt;

mod app_context;
mod controller;
mod session;
#[cfg(test)]
mod session_test;
#[cfg(test)]
pub mod testing;

pub use app_context::{ApplicationContext, CallInfo};
pub use controller::{CallController, InputConstraints, PendingRead, TurnReply};
pub use session::{AppFactory, CallSessionManager, ClockHook, SessionSummary, TurnRequest};

/// Action returned by [`CallApp`] handlers.
#[derive(Debug)]
pub enum AppAction {
    /// A read was registered on the controller; wait for the next turn.
    Continue,
    /// End the call after the buffered messages.
    Hangup,
    /// Hand the call to another entry point.
    Transfer(String),
}

/// Reason for application exit, passed to [`CallApp::on_exit`].
#[derive(Debug, Clone)]
pub enum ExitReason {
    /// The app hung up.
    Hangup,
    /// The caller hung up.
    RemoteHangup,
    /// Transferred to another entry point.
    Transferred,
    /// Dropped by an operator or the idle sweeper.
    Cancelled,
    /// Error during execution.
    Error(String),
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Hangup => write!(f, "hangup"),
            ExitReason::RemoteHangup => write!(f, "remote_hangup"),
            ExitReason::Transferred => write!(f, "transferred"),
            ExitReason::Cancelled => write!(f, "cancelled"),
            ExitReason::Error(e) => write!(f, "error: {}", e),
        }
    }
}

/// A call flow driven one turn at a time.
#[async_trait]
pub trait CallApp: Send + Sync {
    /// Application name (used in logs).
    fn name(&self) -> &str;

    /// Name of the step currently waiting for input.
    fn current_step(&self) -> String;

    /// Called on the first turn of the call.
    async fn on_enter(
        &mut self,
        controller: &mut CallController,
        context: &ApplicationContext,
    ) -> anyhow::Result<AppAction>;

    /// Called with digits that satisfied the pending read's constraints.
    async fn on_input(
        &mut self,
        digits: String,
        controller: &mut CallController,
        context: &ApplicationContext,
    ) -> anyhow::Result<AppAction>;

    /// Called once when the session is dropped.
    async fn on_exit(&mut self, reason: ExitReason) -> anyhow::Result<()> {
        let _ = reason;
        Ok(())
    }
}

impl fmt::Debug for dyn CallApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallApp")
            .field("name", &self.name())
            .field("step", &self.current_step())
            .finish()
    }
}
