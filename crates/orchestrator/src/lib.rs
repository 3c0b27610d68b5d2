//! Conversation orchestration
//!
//! One actor per live call. The actor owns the conversation record, the
//! audio buffer and the dialogue session; everything reaches it through a
//! bounded input queue, so turns are processed strictly one at a time and
//! no lock is shared across calls. Collaborator failures degrade the turn
//! (fallback phrase, text delivery), never the call; only the transport
//! dying ends it.

pub mod call;
pub mod playback;
pub mod writer;

pub use call::{
    spawn_call, CallCollaborators, CallEvent, CallHandle, CallInput, CallState,
};
pub use playback::{ChannelPlayback, Playback, PlaybackCommand, PlaybackError};
pub use writer::TranscriptWriter;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("call is closed")]
    Closed,

    #[error("call input queue is full")]
    QueueFull,

    #[error(transparent)]
    Store(#[from] omniline_persistence::StoreError),
}
