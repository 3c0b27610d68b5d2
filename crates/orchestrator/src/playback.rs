//! Outbound delivery contract

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("transport closed")]
    Closed,

    #[error("transport error: {0}")]
    Transport(String),
}

/// Delivers assistant output to the caller's transport. A failure here is
/// call-fatal: if we cannot reach the caller, there is no call left.
#[async_trait]
pub trait Playback: Send + Sync {
    /// Deliver pre-framed audio, in order.
    async fn play_audio(&self, frames: Vec<String>) -> Result<(), PlaybackError>;

    /// Deliver a reply as text, for channels (or degraded calls) that
    /// render it.
    async fn play_text(&self, text: &str) -> Result<(), PlaybackError>;

    /// Ask the transport to end the call.
    async fn hangup(&self) -> Result<(), PlaybackError>;
}

/// What a [`ChannelPlayback`] emits. The transport layer maps these onto
/// its wire frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCommand {
    Audio(Vec<String>),
    Text(String),
    Hangup,
}

/// Playback over an in-process channel. The receiving side is the
/// transport task (or a test).
pub struct ChannelPlayback {
    tx: mpsc::Sender<PlaybackCommand>,
}

impl ChannelPlayback {
    pub fn new(tx: mpsc::Sender<PlaybackCommand>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Playback for ChannelPlayback {
    async fn play_audio(&self, frames: Vec<String>) -> Result<(), PlaybackError> {
        self.tx
            .send(PlaybackCommand::Audio(frames))
            .await
            .map_err(|_| PlaybackError::Closed)
    }

    async fn play_text(&self, text: &str) -> Result<(), PlaybackError> {
        self.tx
            .send(PlaybackCommand::Text(text.to_string()))
            .await
            .map_err(|_| PlaybackError::Closed)
    }

    async fn hangup(&self) -> Result<(), PlaybackError> {
        self.tx
            .send(PlaybackCommand::Hangup)
            .await
            .map_err(|_| PlaybackError::Closed)
    }
}
