//! Core domain types for the omniline voice orchestrator
//!
//! This crate provides foundational types used across all other crates:
//! - Conversations and their channel history
//! - Turns (utterances and system events)
//! - Communication channels
//! - Transcription results

pub mod channel;
pub mod conversation;
pub mod transcript;
pub mod turn;

pub use channel::Channel;
pub use conversation::{ChannelSwitch, ClosedReason, Conversation, ConversationStatus};
pub use transcript::Transcription;
pub use turn::{Direction, SenderRole, Turn};
