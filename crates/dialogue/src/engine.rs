//! Engine contract and per-call session state

use async_trait::async_trait;
use serde_json::Value;

use omniline_tools::{ToolOutput, ToolSchema};

use crate::DialogueError;

/// How many prior messages travel with each engine request. Older history
/// is dropped; calls are short and the window keeps provider payloads
/// bounded.
const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryRole {
    Caller,
    Assistant,
    Tool,
}

#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub role: HistoryRole,
    pub content: String,
}

/// A tool invocation the engine wants before it can answer.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// What the engine produced for one caller utterance.
#[derive(Debug, Clone)]
pub enum EngineReply {
    Text(String),
    ToolCall(ToolCallRequest),
}

/// Conversational state carried across one call. Owned by the call actor,
/// mutated only between turns.
#[derive(Debug, Clone)]
pub struct DialogueSession {
    pub persona: String,
    pub language: String,
    history: Vec<HistoryMessage>,
}

impl DialogueSession {
    pub fn new(persona: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            language: language.into(),
            history: Vec::new(),
        }
    }

    pub fn record(&mut self, role: HistoryRole, content: impl Into<String>) {
        self.history.push(HistoryMessage {
            role,
            content: content.into(),
        });
        if self.history.len() > HISTORY_WINDOW {
            let excess = self.history.len() - HISTORY_WINDOW;
            self.history.drain(..excess);
        }
    }

    /// Most recent messages, oldest first.
    pub fn history(&self) -> &[HistoryMessage] {
        &self.history
    }
}

/// Produces assistant replies. One `respond` per caller utterance; when it
/// asks for a tool, the caller runs it and finishes the turn with exactly
/// one `resume_with_tool`.
#[async_trait]
pub trait DialogueEngine: Send + Sync {
    async fn respond(
        &self,
        session: &DialogueSession,
        user_text: &str,
        tools: &[ToolSchema],
    ) -> Result<EngineReply, DialogueError>;

    /// Fold one tool result back in and produce the final reply text for
    /// this turn. Never requests another tool.
    async fn resume_with_tool(
        &self,
        session: &DialogueSession,
        request: &ToolCallRequest,
        output: &ToolOutput,
    ) -> Result<String, DialogueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_window_is_bounded() {
        let mut session = DialogueSession::new("Sara", "fr");
        for i in 0..25 {
            session.record(HistoryRole::Caller, format!("message {i}"));
        }
        assert_eq!(session.history().len(), 10);
        assert_eq!(session.history()[0].content, "message 15");
        assert_eq!(session.history()[9].content, "message 24");
    }
}
