//! Audio pipeline for the omniline voice orchestrator
//!
//! Holds the per-call audio buffer with inactivity-based end-of-utterance
//! detection, and the contracts for the external speech collaborators (STT
//! and TTS) together with the synthesis fallback chain.

pub mod buffer;
pub mod stt;
pub mod tts;

pub use buffer::{split_outbound, AudioBuffer, AudioChunk, BufferStats};
pub use stt::{NoopStt, ScriptedStt, SpeechToText};
pub use tts::{SpeechSynthesizer, SpokenReply, TextToSpeech, UnavailableTts, VoiceSelection};

use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}
