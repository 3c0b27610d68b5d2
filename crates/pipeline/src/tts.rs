//! Text-to-speech contract and fallback chain
//!
//! Synthesis failures must never kill a call. `SpeechSynthesizer` tries the
//! primary provider, then an optional fallback, and finally degrades to
//! plain text so the transport can still deliver the reply on channels that
//! can render it.

use async_trait::async_trait;

use crate::PipelineError;

/// Provider and voice chosen by the agent profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceSelection {
    pub provider: String,
    pub voice_id: String,
    pub language: String,
}

/// Turns reply text into raw audio.
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceSelection)
        -> Result<Vec<u8>, PipelineError>;
}

/// What the call ends up delivering for one assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpokenReply {
    Audio(Vec<u8>),
    /// Every synthesis path failed; deliver the reply as text.
    Text(String),
}

/// Primary/fallback synthesis chain.
pub struct SpeechSynthesizer {
    primary: Box<dyn TextToSpeech>,
    fallback: Option<Box<dyn TextToSpeech>>,
}

impl SpeechSynthesizer {
    pub fn new(primary: Box<dyn TextToSpeech>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn TextToSpeech>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Synthesize `text`, degrading to `SpokenReply::Text` if both providers
    /// fail. Never returns an error.
    pub async fn speak(&self, text: &str, voice: &VoiceSelection) -> SpokenReply {
        match self.primary.synthesize(text, voice).await {
            Ok(audio) => return SpokenReply::Audio(audio),
            Err(err) => {
                tracing::warn!(provider = %voice.provider, error = %err, "primary synthesis failed");
            }
        }

        if let Some(fallback) = &self.fallback {
            match fallback.synthesize(text, voice).await {
                Ok(audio) => return SpokenReply::Audio(audio),
                Err(err) => {
                    tracing::warn!(error = %err, "fallback synthesis failed");
                }
            }
        }

        SpokenReply::Text(text.to_string())
    }
}

/// Provider that always fails. Default when no real engine is configured;
/// the chain then degrades to text delivery.
pub struct UnavailableTts;

#[async_trait]
impl TextToSpeech for UnavailableTts {
    async fn synthesize(
        &self,
        _text: &str,
        _voice: &VoiceSelection,
    ) -> Result<Vec<u8>, PipelineError> {
        Err(PipelineError::Unavailable("no synthesis provider".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedTts(Vec<u8>);

    #[async_trait]
    impl TextToSpeech for FixedTts {
        async fn synthesize(
            &self,
            _text: &str,
            _voice: &VoiceSelection,
        ) -> Result<Vec<u8>, PipelineError> {
            Ok(self.0.clone())
        }
    }

    fn voice() -> VoiceSelection {
        VoiceSelection {
            provider: "elevenlabs".into(),
            voice_id: "sara".into(),
            language: "fr".into(),
        }
    }

    #[tokio::test]
    async fn test_primary_audio_wins() {
        let chain = SpeechSynthesizer::new(Box::new(FixedTts(vec![1, 2, 3])));
        assert_eq!(chain.speak("bonjour", &voice()).await, SpokenReply::Audio(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let chain = SpeechSynthesizer::new(Box::new(UnavailableTts))
            .with_fallback(Box::new(FixedTts(vec![9])));
        assert_eq!(chain.speak("bonjour", &voice()).await, SpokenReply::Audio(vec![9]));
    }

    #[tokio::test]
    async fn test_degrades_to_text_when_all_fail() {
        let chain = SpeechSynthesizer::new(Box::new(UnavailableTts));
        assert_eq!(
            chain.speak("bonjour", &voice()).await,
            SpokenReply::Text("bonjour".into())
        );
    }
}
