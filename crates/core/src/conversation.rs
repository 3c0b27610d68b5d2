//! Conversation state
//!
//! A conversation is one logical interaction with a counterparty, independent
//! of which channel currently carries it. It is created when a call or
//! session begins, mutated by the channel switcher and the orchestrator, and
//! closed (never deleted) when the interaction ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::Channel;

/// Lifecycle status of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    TransferPending,
    Closed,
}

/// Why a conversation was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedReason {
    /// Caller and agent finished normally.
    Completed,
    /// Call ended because it was handed to a human.
    Transfer,
    /// Transport or internal failure forced the close.
    Error,
}

/// One recorded channel transition inside a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSwitch {
    pub from: Channel,
    pub to: Channel,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// One logical interaction with a counterparty.
///
/// Invariant: `current_channel` is always a member of `active_channels`.
/// The constructor and [`Conversation::switch_to`] are the only ways the
/// channel fields change, and both maintain it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    /// Counterparty address, e.g. an E.164 phone number.
    pub caller: String,
    pub current_channel: Channel,
    pub active_channels: Vec<Channel>,
    pub switches: Vec<ChannelSwitch>,
    pub status: ConversationStatus,
    pub closed_reason: Option<ClosedReason>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Start a new conversation on the given channel.
    pub fn new(
        tenant_id: impl Into<String>,
        caller: impl Into<String>,
        channel: Channel,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.into(),
            caller: caller.into(),
            current_channel: channel,
            active_channels: vec![channel],
            switches: Vec::new(),
            status: ConversationStatus::Active,
            closed_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ConversationStatus::Active
    }

    /// Move the conversation to a new channel, recording the switch.
    ///
    /// Adds `to` to the active set if it is new. Callers are expected to have
    /// consulted the transition rules first; this method only records.
    pub fn switch_to(&mut self, to: Channel, reason: impl Into<String>) {
        let from = self.current_channel;
        if !self.active_channels.contains(&to) {
            self.active_channels.push(to);
        }
        self.switches.push(ChannelSwitch {
            from,
            to,
            reason: reason.into(),
            at: Utc::now(),
        });
        self.current_channel = to;
        self.updated_at = Utc::now();
    }

    /// Mark the conversation as waiting for a human handoff.
    pub fn mark_transfer_pending(&mut self) {
        self.status = ConversationStatus::TransferPending;
        self.updated_at = Utc::now();
    }

    /// Close the conversation with a final reason. Idempotent.
    pub fn close(&mut self, reason: ClosedReason) {
        if self.status == ConversationStatus::Closed {
            return;
        }
        self.status = ConversationStatus::Closed;
        self.closed_reason = Some(reason);
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_conversation_invariant() {
        let conv = Conversation::new("tenant-1", "+33612345678", Channel::Voice);
        assert!(conv.active_channels.contains(&conv.current_channel));
        assert_eq!(conv.status, ConversationStatus::Active);
        assert!(conv.closed_reason.is_none());
    }

    #[test]
    fn test_switch_records_event_and_keeps_invariant() {
        let mut conv = Conversation::new("tenant-1", "+33612345678", Channel::Voice);
        conv.switch_to(Channel::Sms, "caller asked for a text");

        assert_eq!(conv.current_channel, Channel::Sms);
        assert!(conv.active_channels.contains(&Channel::Voice));
        assert!(conv.active_channels.contains(&Channel::Sms));
        assert_eq!(conv.switches.len(), 1);
        assert_eq!(conv.switches[0].from, Channel::Voice);
        assert_eq!(conv.switches[0].to, Channel::Sms);
    }

    #[test]
    fn test_switch_back_does_not_duplicate_active_channel() {
        let mut conv = Conversation::new("tenant-1", "+33612345678", Channel::Voice);
        conv.switch_to(Channel::Sms, "first");
        conv.switch_to(Channel::Voice, "back");

        assert_eq!(conv.active_channels.len(), 2);
        assert_eq!(conv.switches.len(), 2);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut conv = Conversation::new("tenant-1", "+33612345678", Channel::Voice);
        conv.close(ClosedReason::Completed);
        conv.close(ClosedReason::Error);

        assert_eq!(conv.closed_reason, Some(ClosedReason::Completed));
    }
}
