//! Per-tenant agent profile
//!
//! The orchestrator consumes, but does not own, these settings. A profile is
//! loaded when a call starts and stays immutable for the duration of that
//! call.

use serde::{Deserialize, Serialize};

/// Agent persona and voice configuration for one tenant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Display name the agent uses for itself.
    #[serde(default = "default_agent_name")]
    pub agent_name: String,

    /// System prompt handed to the dialogue engine.
    #[serde(default = "default_persona")]
    pub persona: String,

    /// TTS provider identifier (primary voice).
    #[serde(default = "default_voice_provider")]
    pub voice_provider: String,

    /// Provider-specific voice id.
    #[serde(default)]
    pub voice_id: String,

    /// Spoken language hint for STT and TTS (ISO 639-1).
    #[serde(default = "default_language")]
    pub language: String,

    /// Spoken when the call connects.
    #[serde(default = "default_greeting")]
    pub greeting: String,

    /// Spoken whenever a collaborator fails mid-turn.
    #[serde(default = "default_fallback_phrase")]
    pub fallback_phrase: String,

    /// Spoken before handing off to a human.
    #[serde(default = "default_transfer_phrase")]
    pub transfer_phrase: String,

    /// Spoken before the call closes.
    #[serde(default = "default_goodbye_phrase")]
    pub goodbye_phrase: String,

    /// Names of the tools offered to the dialogue engine for this agent.
    #[serde(default = "default_enabled_tools")]
    pub enabled_tools: Vec<String>,
}

fn default_agent_name() -> String {
    "Sara".to_string()
}

fn default_persona() -> String {
    "You are Sara, a warm, professional phone assistant. Keep replies to one \
     or two short sentences, speak naturally, and never read out lists. Use \
     the available tools to look up offers and to book appointments."
        .to_string()
}

fn default_voice_provider() -> String {
    "primary".to_string()
}

fn default_language() -> String {
    "fr".to_string()
}

fn default_greeting() -> String {
    "Bonjour, je suis Sara. Comment puis-je vous aider ?".to_string()
}

fn default_fallback_phrase() -> String {
    "Je n'ai pas bien compris, pouvez-vous reformuler ?".to_string()
}

fn default_transfer_phrase() -> String {
    "Je vous transfère vers un conseiller. Veuillez patienter un instant.".to_string()
}

fn default_goodbye_phrase() -> String {
    "Au revoir et bonne journée !".to_string()
}

fn default_enabled_tools() -> Vec<String> {
    vec![
        "search_catalog".to_string(),
        "book_appointment".to_string(),
        "check_availability".to_string(),
    ]
}

impl Default for AgentProfile {
    fn default() -> Self {
        Self {
            agent_name: default_agent_name(),
            persona: default_persona(),
            voice_provider: default_voice_provider(),
            voice_id: String::new(),
            language: default_language(),
            greeting: default_greeting(),
            fallback_phrase: default_fallback_phrase(),
            transfer_phrase: default_transfer_phrase(),
            goodbye_phrase: default_goodbye_phrase(),
            enabled_tools: default_enabled_tools(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_offers_tools() {
        let profile = AgentProfile::default();
        assert!(profile
            .enabled_tools
            .iter()
            .any(|t| t == "book_appointment"));
        assert!(!profile.fallback_phrase.is_empty());
    }
}
