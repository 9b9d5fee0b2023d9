//! Chat Test Session: a transient, dialog-scoped turn sequence against one
//! provider. Two states: idle and awaiting-reply; at most one request is
//! outstanding per session, and a failed turn appends no assistant message.

use serde::Serialize;
use uuid::Uuid;

use crate::error::{ConfigError, Result};
use crate::models::normalize_string;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingReply,
}

#[derive(Debug)]
pub struct ChatSession {
    id: Uuid,
    provider_id: String,
    model: Option<String>,
    state: SessionState,
    turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(provider_id: &str, model: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_id: provider_id.to_string(),
            model,
            state: SessionState::Idle,
            turns: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_awaiting(&self) -> bool {
        self.state == SessionState::AwaitingReply
    }

    /// Turns in strict submission order.
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Appends the user turn and transitions to awaiting-reply. Rejected
    /// while a request is already outstanding.
    pub fn submit(&mut self, content: &str) -> Result<()> {
        if self.is_awaiting() {
            return Err(ConfigError::SessionBusy);
        }
        let content = normalize_string(content)
            .ok_or_else(|| ConfigError::Validation("message cannot be empty".to_string()))?;
        self.turns.push(ChatTurn {
            role: ChatRole::User,
            content,
        });
        self.state = SessionState::AwaitingReply;
        Ok(())
    }

    /// Appends exactly one assistant turn and returns to idle.
    pub fn resolve(&mut self, reply: &str) {
        if self.is_awaiting() {
            self.turns.push(ChatTurn {
                role: ChatRole::Assistant,
                content: reply.to_string(),
            });
        }
        self.state = SessionState::Idle;
    }

    /// Returns to idle without appending a turn; the failure is reported to
    /// the caller, not recorded as a message.
    pub fn fail(&mut self) {
        self.state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_then_resolve_orders_turns() {
        let mut session = ChatSession::new("a", None);
        session.submit("hi").expect("submit should succeed");
        assert!(session.is_awaiting());
        assert_eq!(session.turns().len(), 1);

        session.resolve("hello");
        assert_eq!(session.state(), SessionState::Idle);

        let turns = session.turns();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[0].content, "hi");
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert_eq!(turns[1].content, "hello");
    }

    #[test]
    fn double_submit_is_rejected() {
        let mut session = ChatSession::new("a", None);
        session.submit("first").expect("submit should succeed");

        let err = session.submit("second").expect_err("busy session should reject");
        assert!(matches!(err, ConfigError::SessionBusy));
        assert_eq!(session.turns().len(), 1);
    }

    #[test]
    fn failure_appends_no_assistant_turn() {
        let mut session = ChatSession::new("a", Some("m1".to_string()));
        session.submit("hi").expect("submit should succeed");

        session.fail();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.turns().len(), 1);

        // The session is usable again after a failure.
        session.submit("retry").expect("idle session should accept");
        assert_eq!(session.turns().len(), 2);
    }

    #[test]
    fn blank_message_is_a_validation_error() {
        let mut session = ChatSession::new("a", None);
        let err = session.submit("   ").expect_err("blank message should fail");
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(session.state(), SessionState::Idle);
    }
}
