//! Speech-to-text contract
//!
//! Transcription is an external collaborator behind a trait so the
//! orchestrator can be exercised with scripted doubles. Providers are wired
//! at startup; the orchestrator only sees this interface.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use omniline_core::Transcription;

use crate::PipelineError;

/// Turns one continuous audio payload into text.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: &[u8], language: &str)
        -> Result<Transcription, PipelineError>;
}

/// Always returns an empty transcription. Default provider when no real
/// engine is configured; an empty result is skipped upstream, so the call
/// stays alive.
pub struct NoopStt;

#[async_trait]
impl SpeechToText for NoopStt {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _language: &str,
    ) -> Result<Transcription, PipelineError> {
        Ok(Transcription::empty())
    }
}

/// Test double that replays queued results in order, then empty
/// transcriptions once drained.
pub struct ScriptedStt {
    script: Mutex<VecDeque<Result<Transcription, PipelineError>>>,
}

impl ScriptedStt {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.script
            .lock()
            .push_back(Ok(Transcription::new(text, 0.95)));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .push_back(Err(PipelineError::Transcription(message.into())));
    }
}

impl Default for ScriptedStt {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechToText for ScriptedStt {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _language: &str,
    ) -> Result<Transcription, PipelineError> {
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(Transcription::empty()))
    }
}
