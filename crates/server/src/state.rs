//! Shared application state

use std::sync::Arc;

use omniline_channels::ChannelSwitcher;
use omniline_config::Settings;
use omniline_dialogue::DialogueEngine;
use omniline_persistence::Stores;
use omniline_pipeline::{SpeechSynthesizer, SpeechToText};
use omniline_tools::{default_registry, ToolRegistry};

use crate::calls::CallManager;

/// Everything the handlers share. Per-call state lives in the call actors.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub calls: Arc<CallManager>,
    pub stores: Stores,
    pub stt: Arc<dyn SpeechToText>,
    pub synthesizer: Arc<SpeechSynthesizer>,
    pub engine: Arc<dyn DialogueEngine>,
    pub tools: Arc<ToolRegistry>,
    pub switcher: Arc<ChannelSwitcher>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        stores: Stores,
        stt: Arc<dyn SpeechToText>,
        synthesizer: Arc<SpeechSynthesizer>,
        engine: Arc<dyn DialogueEngine>,
    ) -> Self {
        let tools = default_registry(&stores);
        let switcher = Arc::new(ChannelSwitcher::new(
            stores.conversations.clone(),
            stores.turns.clone(),
        ));
        Self {
            calls: Arc::new(CallManager::new(settings.server.max_calls)),
            settings: Arc::new(settings),
            stores,
            stt,
            synthesizer,
            engine,
            tools,
            switcher,
        }
    }
}
