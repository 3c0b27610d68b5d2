//! Scripted engine double for orchestrator tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use omniline_tools::{ToolOutput, ToolSchema};

use crate::engine::{DialogueEngine, DialogueSession, EngineReply, ToolCallRequest};
use crate::DialogueError;

/// Replays queued replies in order; falls back to a fixed default once the
/// queue is drained. Counts invocations so tests can assert how many engine
/// round trips a turn cost.
pub struct ScriptedEngine {
    replies: Mutex<VecDeque<Result<EngineReply, DialogueError>>>,
    resume_replies: Mutex<VecDeque<String>>,
    default_reply: String,
    respond_calls: AtomicUsize,
    resume_calls: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            resume_replies: Mutex::new(VecDeque::new()),
            default_reply: default_reply.into(),
            respond_calls: AtomicUsize::new(0),
            resume_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.replies
            .lock()
            .push_back(Ok(EngineReply::Text(text.into())));
    }

    pub fn push_tool_call(&self, name: impl Into<String>, arguments: serde_json::Value) {
        let mut replies = self.replies.lock();
        let id = format!("call-{}", replies.len());
        replies.push_back(Ok(EngineReply::ToolCall(ToolCallRequest {
            id,
            name: name.into(),
            arguments,
        })));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .push_back(Err(DialogueError::Provider(message.into())));
    }

    pub fn push_resume_reply(&self, text: impl Into<String>) {
        self.resume_replies.lock().push_back(text.into());
    }

    pub fn respond_calls(&self) -> usize {
        self.respond_calls.load(Ordering::SeqCst)
    }

    pub fn resume_calls(&self) -> usize {
        self.resume_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DialogueEngine for ScriptedEngine {
    async fn respond(
        &self,
        _session: &DialogueSession,
        _user_text: &str,
        _tools: &[ToolSchema],
    ) -> Result<EngineReply, DialogueError> {
        self.respond_calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(EngineReply::Text(self.default_reply.clone())))
    }

    async fn resume_with_tool(
        &self,
        _session: &DialogueSession,
        request: &ToolCallRequest,
        output: &ToolOutput,
    ) -> Result<String, DialogueError> {
        self.resume_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(scripted) = self.resume_replies.lock().pop_front() {
            return Ok(scripted);
        }
        Ok(format!(
            "Voici ce que j'ai trouvé avec {}: {}",
            request.name,
            output.first_text().unwrap_or_default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_engine_counts_calls() {
        let engine = ScriptedEngine::new("Je suis là pour vous aider.");
        engine.push_text("Bonjour !");

        let session = DialogueSession::new("Sara", "fr");
        let first = engine.respond(&session, "allo", &[]).await.unwrap();
        assert!(matches!(first, EngineReply::Text(t) if t == "Bonjour !"));

        let drained = engine.respond(&session, "allo", &[]).await.unwrap();
        assert!(matches!(drained, EngineReply::Text(t) if t == "Je suis là pour vous aider."));
        assert_eq!(engine.respond_calls(), 2);
    }
}
