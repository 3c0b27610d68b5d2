//! Configuration for the omniline voice orchestrator
//!
//! Settings are layered from `config/default`, an optional per-environment
//! file, and `OMNILINE__*` environment variables. Every field has a serde
//! default so a bare deployment starts with sane values.

pub mod agent;
pub mod settings;

pub use agent::AgentProfile;
pub use settings::{
    load_settings, ObservabilityConfig, OrchestratorConfig, ServerConfig, Settings,
};

use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}
