//! Transcription results from the speech-to-text collaborator

use serde::{Deserialize, Serialize};

/// Result of transcribing one buffered utterance.
///
/// The STT collaborator is expected to tolerate empty or garbled input by
/// returning an empty transcript rather than failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl Transcription {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }

    /// An empty transcription, the tolerant result for unusable audio.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}
