use super::AppAction;
use serde::{Deserialize, Serialize};

/// Digit constraints for one read. The gateway enforces them while collecting
/// and [`CallSessionManager`](super::CallSessionManager) checks them again
/// before the flow sees the digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConstraints {
    pub min_digits: usize,
    pub max_digits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_digits: Option<String>,
}

impl InputConstraints {
    pub fn digits(min_digits: usize, max_digits: usize) -> Self {
        Self {
            min_digits,
            max_digits,
            allowed_digits: None,
        }
    }

    pub fn exact(count: usize) -> Self {
        Self::digits(count, count)
    }

    /// A single keypress from `allowed`.
    pub fn one_of(allowed: impl Into<String>) -> Self {
        Self {
            min_digits: 1,
            max_digits: 1,
            allowed_digits: Some(allowed.into()),
        }
    }

    pub fn with_allowed(mut self, allowed: impl Into<String>) -> Self {
        self.allowed_digits = Some(allowed.into());
        self
    }

    pub fn accepts(&self, digits: &str) -> bool {
        let len = digits.chars().count();
        if len < self.min_digits || len > self.max_digits {
            return false;
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return false;
        }
        match &self.allowed_digits {
            Some(allowed) => digits.chars().all(|c| allowed.contains(c)),
            None => true,
        }
    }
}

/// An outstanding read waiting for the caller's next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRead {
    pub prompt: String,
    pub constraints: InputConstraints,
}

/// What the gateway should do after this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TurnReply {
    /// Play `messages`, then `prompt`, and collect digits.
    Read {
        messages: Vec<String>,
        prompt: String,
        constraints: InputConstraints,
    },
    /// Play `messages` and end the call.
    Hangup { messages: Vec<String> },
    /// Play `messages` and hand the call to another entry point.
    Transfer {
        messages: Vec<String>,
        target: String,
    },
}

impl TurnReply {
    pub fn messages(&self) -> &[String] {
        match self {
            TurnReply::Read { messages, .. }
            | TurnReply::Hangup { messages }
            | TurnReply::Transfer { messages, .. } => messages,
        }
    }

    pub fn prompt(&self) -> Option<&str> {
        match self {
            TurnReply::Read { prompt, .. } => Some(prompt),
            _ => None,
        }
    }

    pub fn is_hangup(&self) -> bool {
        matches!(self, TurnReply::Hangup { .. })
    }
}

/// Gateway-facing primitives available to a [`CallApp`](super::CallApp)
/// during one turn.
///
/// Messages are buffered and delivered with whatever the turn ends in: the
/// next read, a hangup, or a transfer. Ask-style methods register the read
/// and return [`AppAction::Continue`] so a step can end with
/// `return Ok(ctrl.ask_for_input(..))`.
#[derive(Debug, Default)]
pub struct CallController {
    messages: Vec<String>,
    pending: Option<PendingRead>,
}

impl CallController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire-and-forget text played before the next prompt.
    pub fn send_message(&mut self, text: impl Into<String>) {
        self.messages.push(text.into());
    }

    pub fn ask_for_input(
        &mut self,
        prompt: impl Into<String>,
        constraints: InputConstraints,
    ) -> AppAction {
        self.pending = Some(PendingRead {
            prompt: prompt.into(),
            constraints,
        });
        AppAction::Continue
    }

    /// Yes/no question; `1` is yes and `2` is no.
    pub fn ask_confirmation(&mut self, prompt: impl Into<String>) -> AppAction {
        self.ask_for_input(prompt, InputConstraints::one_of("12"))
    }

    /// A single keypress chosen from `options`.
    pub fn ask_for_menu(&mut self, prompt: impl Into<String>, options: &[char]) -> AppAction {
        let allowed: String = options.iter().collect();
        self.ask_for_input(prompt, InputConstraints::one_of(allowed))
    }

    pub fn hangup_with_message(&mut self, text: impl Into<String>) -> AppAction {
        self.messages.push(text.into());
        self.pending = None;
        AppAction::Hangup
    }

    pub fn pending(&self) -> Option<&PendingRead> {
        self.pending.as_ref()
    }

    pub(crate) fn take_pending(&mut self) -> Option<PendingRead> {
        self.pending.take()
    }

    pub(crate) fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}
