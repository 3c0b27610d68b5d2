//! Turn types
//!
//! A turn is one utterance or system event inside a conversation. Turns are
//! append-only and ordered by creation time; persisting them must never block
//! the live audio path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::Channel;

/// Direction of a turn relative to the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Who produced the content of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Caller,
    Assistant,
    System,
}

/// One utterance or system event within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub id: String,
    pub conversation_id: String,
    pub channel: Channel,
    pub direction: Direction,
    pub role: SenderRole,
    pub content: String,
    /// Raw transcript for voice turns, when it differs from `content`.
    pub transcript: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    fn new(
        conversation_id: &str,
        channel: Channel,
        direction: Direction,
        role: SenderRole,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            channel,
            direction,
            role,
            content: content.into(),
            transcript: None,
            created_at: Utc::now(),
        }
    }

    /// A caller utterance arriving over `channel`.
    pub fn inbound(conversation_id: &str, channel: Channel, content: impl Into<String>) -> Self {
        Self::new(
            conversation_id,
            channel,
            Direction::Inbound,
            SenderRole::Caller,
            content,
        )
    }

    /// An assistant reply going out over `channel`.
    pub fn outbound(conversation_id: &str, channel: Channel, content: impl Into<String>) -> Self {
        Self::new(
            conversation_id,
            channel,
            Direction::Outbound,
            SenderRole::Assistant,
            content,
        )
    }

    /// A system event (channel switch announcement, DTMF record, ...).
    pub fn system(conversation_id: &str, channel: Channel, content: impl Into<String>) -> Self {
        Self::new(
            conversation_id,
            channel,
            Direction::Outbound,
            SenderRole::System,
            content,
        )
    }

    /// Attach the raw transcript behind a voice turn.
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }
}
