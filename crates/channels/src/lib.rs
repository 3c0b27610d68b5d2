//! Channel switching for live conversations
//!
//! A conversation starts on one channel and may move to another mid-flight
//! (voice to SMS for a written confirmation, SMS to voice for a callback).
//! Switching mutates the conversation record, keeps the full channel
//! history, and leaves a system turn in the transcript so a reader can see
//! where the thread moved.

pub mod context;
pub mod switcher;

pub use context::{suggested_channel, ChannelContext};
pub use switcher::{can_switch, ChannelSwitcher, SwitchError, SwitchOutcome};
