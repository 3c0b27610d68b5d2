//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{AgentProfile, ConfigError};

/// Main application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Per-call orchestration tuning
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Default agent profile (used when a tenant has none of its own)
    #[serde(default)]
    pub agent: AgentProfile,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings that have inter-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let orch = &self.orchestrator;

        // Below ~100ms the detector fires inside normal inter-word pauses.
        if orch.silence_threshold_ms < 100 {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.silence_threshold_ms".to_string(),
                message: "silence threshold too low (minimum 100ms)".to_string(),
            });
        }

        if orch.silence_poll_ms == 0 || orch.silence_poll_ms > orch.silence_threshold_ms {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.silence_poll_ms".to_string(),
                message: "poll interval must be non-zero and at most the silence threshold"
                    .to_string(),
            });
        }

        if orch.buffer_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "orchestrator.buffer_capacity".to_string(),
                message: "audio buffer capacity must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// WebSocket path for the call transport
    #[serde(default = "default_ws_path")]
    pub ws_path: String,

    /// Maximum concurrently active calls
    #[serde(default = "default_max_calls")]
    pub max_calls: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_ws_path() -> String {
    "/ws/call".to_string()
}
fn default_max_calls() -> usize {
    500
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            max_calls: default_max_calls(),
            cors_enabled: default_true(),
        }
    }
}

/// Per-call orchestration tuning knobs.
///
/// The silence threshold is the precision/latency trade-off at the heart of
/// end-of-utterance detection: too short interrupts the caller, too long
/// reads as lag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Inactivity gap that ends an utterance, in milliseconds.
    #[serde(default = "default_silence_threshold_ms")]
    pub silence_threshold_ms: u64,

    /// How often the actor polls the buffer for silence, in milliseconds.
    #[serde(default = "default_silence_poll_ms")]
    pub silence_poll_ms: u64,

    /// Bounded audio window per call, in chunks.
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    /// Timeout for one STT request, in milliseconds.
    #[serde(default = "default_stt_timeout_ms")]
    pub stt_timeout_ms: u64,

    /// Timeout for one dialogue engine request, in milliseconds.
    #[serde(default = "default_dialogue_timeout_ms")]
    pub dialogue_timeout_ms: u64,

    /// Timeout for one TTS request, in milliseconds.
    #[serde(default = "default_tts_timeout_ms")]
    pub tts_timeout_ms: u64,

    /// Grace period for goodbye playback before resources are released.
    #[serde(default = "default_playback_grace_ms")]
    pub playback_grace_ms: u64,

    /// Grace period between the transfer announcement and the close.
    #[serde(default = "default_transfer_grace_ms")]
    pub transfer_grace_ms: u64,

    /// Outbound audio frame size in bytes (~20ms of 8kHz mulaw).
    #[serde(default = "default_outbound_chunk_bytes")]
    pub outbound_chunk_bytes: usize,

    /// Depth of the per-call transcript write queue.
    #[serde(default = "default_write_queue_size")]
    pub write_queue_size: usize,

    /// Attempts per transcript write before it is dropped.
    #[serde(default = "default_write_attempts")]
    pub write_attempts: u32,
}

fn default_silence_threshold_ms() -> u64 {
    1000
}
fn default_silence_poll_ms() -> u64 {
    100
}
fn default_buffer_capacity() -> usize {
    100
}
fn default_stt_timeout_ms() -> u64 {
    5000
}
fn default_dialogue_timeout_ms() -> u64 {
    10_000
}
fn default_tts_timeout_ms() -> u64 {
    5000
}
fn default_playback_grace_ms() -> u64 {
    3000
}
fn default_transfer_grace_ms() -> u64 {
    2000
}
fn default_outbound_chunk_bytes() -> usize {
    160
}
fn default_write_queue_size() -> usize {
    64
}
fn default_write_attempts() -> u32 {
    3
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            silence_threshold_ms: default_silence_threshold_ms(),
            silence_poll_ms: default_silence_poll_ms(),
            buffer_capacity: default_buffer_capacity(),
            stt_timeout_ms: default_stt_timeout_ms(),
            dialogue_timeout_ms: default_dialogue_timeout_ms(),
            tts_timeout_ms: default_tts_timeout_ms(),
            playback_grace_ms: default_playback_grace_ms(),
            transfer_grace_ms: default_transfer_grace_ms(),
            outbound_chunk_bytes: default_outbound_chunk_bytes(),
            write_queue_size: default_write_queue_size(),
            write_attempts: default_write_attempts(),
        }
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON-formatted logs
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from files and environment.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`OMNILINE__` prefix, `__` separator)
/// 2. `config/{env}` (if an environment name is given)
/// 3. `config/default`
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));

    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{}", env_name)).required(false));
    }

    builder = builder.add_source(
        Environment::with_prefix("OMNILINE")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.orchestrator.silence_threshold_ms, 1000);
        assert_eq!(settings.orchestrator.buffer_capacity, 100);
    }

    #[test]
    fn test_validation_rejects_tiny_threshold() {
        let mut settings = Settings::default();
        settings.orchestrator.silence_threshold_ms = 50;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_poll_above_threshold() {
        let mut settings = Settings::default();
        settings.orchestrator.silence_poll_ms = 2000;
        assert!(settings.validate().is_err());

        settings.orchestrator.silence_poll_ms = 250;
        assert!(settings.validate().is_ok());
    }
}
