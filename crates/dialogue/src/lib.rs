//! Dialogue engine contract, per-call session state and intent detection
//!
//! The language model is an external collaborator behind [`DialogueEngine`].
//! The orchestrator never talks to a provider directly; it hands the
//! engine a [`DialogueSession`] plus the caller's words and receives either
//! reply text or a single tool-call request.

pub mod engine;
pub mod intent;
pub mod scripted;

pub use engine::{
    DialogueEngine, DialogueSession, EngineReply, HistoryMessage, HistoryRole, ToolCallRequest,
};
pub use intent::IntentDetector;
pub use scripted::ScriptedEngine;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("dialogue provider error: {0}")]
    Provider(String),

    #[error("dialogue provider timed out")]
    Timeout,
}
