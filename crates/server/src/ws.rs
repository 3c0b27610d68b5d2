//! WebSocket call endpoint
//!
//! One socket carries one call. The first frame must be `start`; after
//! that, inbound `media`, `dtmf` and `stop` frames are forwarded to the
//! call actor, and playback commands coming out of the actor are written
//! back as `play`, `text` and `hangup` frames.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use omniline_orchestrator::{
    spawn_call, CallCollaborators, CallHandle, CallInput, ChannelPlayback, PlaybackCommand,
};

use crate::state::AppState;

/// Frames the transport sends us.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InboundFrame {
    Start {
        tenant_id: String,
        caller: String,
    },
    Media {
        payload: String,
        #[serde(default)]
        timestamp_ms: u64,
    },
    Dtmf {
        digit: char,
    },
    Stop,
}

/// Frames we send back.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundFrame {
    Play { payload: String },
    Text { token: String },
    Hangup,
}

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, mut stream) = socket.split();

    // Nothing happens until the transport identifies the call.
    let (tenant_id, caller) = match read_start_frame(&mut stream).await {
        Some(start) => start,
        None => return,
    };

    let (playback_tx, playback_rx) = mpsc::channel(64);
    let collaborators = CallCollaborators {
        stt: state.stt.clone(),
        synthesizer: state.synthesizer.clone(),
        engine: state.engine.clone(),
        tools: state.tools.clone(),
        stores: state.stores.clone(),
        playback: Arc::new(ChannelPlayback::new(playback_tx)),
    };

    let handle = match spawn_call(
        &tenant_id,
        &caller,
        state.settings.agent.clone(),
        state.settings.orchestrator.clone(),
        collaborators,
    )
    .await
    {
        Ok(handle) => Arc::new(handle),
        Err(err) => {
            tracing::error!(tenant_id, caller, error = %err, "call could not start");
            return;
        }
    };

    if let Err(err) = state.calls.register(handle.clone()) {
        tracing::warn!(tenant_id, error = %err, "call rejected");
        let _ = handle
            .send(CallInput::Stop {
                reason: "capacity".into(),
            })
            .await;
        return;
    }

    let writer = tokio::spawn(write_outbound(sink, playback_rx));
    read_inbound(&mut stream, &handle).await;

    // Give the actor a moment to finish its teardown, then let the writer
    // drain the last outbound frames before the registry entry goes.
    let _ = tokio::time::timeout(Duration::from_secs(10), handle.closed()).await;
    let _ = tokio::time::timeout(Duration::from_secs(2), writer).await;
    state.calls.remove(&handle.conversation_id);
}

async fn read_start_frame(stream: &mut SplitStream<WebSocket>) -> Option<(String, String)> {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<InboundFrame>(&text) {
                Ok(InboundFrame::Start { tenant_id, caller }) => {
                    return Some((tenant_id, caller));
                }
                Ok(_) => {
                    tracing::warn!("frame received before start, ignoring");
                }
                Err(err) => {
                    tracing::warn!(error = %err, "unparseable frame before start");
                }
            },
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

/// Forward transport frames into the actor. Media uses `try_send`: if the
/// actor is busy and its queue fills, dropping a chunk beats building a
/// backlog of stale audio.
async fn read_inbound(stream: &mut SplitStream<WebSocket>, handle: &CallHandle) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<InboundFrame>(&text) {
                Ok(InboundFrame::Media {
                    payload,
                    timestamp_ms,
                }) => {
                    if handle
                        .try_send(CallInput::Media {
                            payload,
                            timestamp_ms,
                        })
                        .is_err()
                    {
                        tracing::debug!(
                            conversation_id = %handle.conversation_id,
                            "media frame dropped"
                        );
                    }
                }
                Ok(InboundFrame::Dtmf { digit }) => {
                    if handle.send(CallInput::Dtmf(digit)).await.is_err() {
                        return;
                    }
                }
                Ok(InboundFrame::Stop) => {
                    let _ = handle
                        .send(CallInput::Stop {
                            reason: "stop frame".into(),
                        })
                        .await;
                    return;
                }
                Ok(InboundFrame::Start { .. }) => {
                    tracing::warn!(
                        conversation_id = %handle.conversation_id,
                        "duplicate start frame ignored"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        conversation_id = %handle.conversation_id,
                        error = %err,
                        "unparseable frame ignored"
                    );
                }
            },
            Ok(Message::Close(_)) | Err(_) => {
                let _ = handle
                    .send(CallInput::Stop {
                        reason: "socket closed".into(),
                    })
                    .await;
                return;
            }
            Ok(_) => {}
        }
    }

    let _ = handle
        .send(CallInput::Stop {
            reason: "socket ended".into(),
        })
        .await;
}

/// Drain playback commands into the socket. Ends when the actor drops its
/// playback handle or the socket dies; dropping the receiver is what tells
/// the actor its transport is gone.
async fn write_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut playback_rx: mpsc::Receiver<PlaybackCommand>,
) {
    while let Some(command) = playback_rx.recv().await {
        let frames = match command {
            PlaybackCommand::Audio(payloads) => payloads
                .into_iter()
                .map(|payload| OutboundFrame::Play { payload })
                .collect(),
            PlaybackCommand::Text(token) => vec![OutboundFrame::Text { token }],
            PlaybackCommand::Hangup => vec![OutboundFrame::Hangup],
        };

        for frame in frames {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "outbound frame not serializable");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                return;
            }
        }
    }

    let _ = sink.close().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_frames_parse() {
        let start: InboundFrame = serde_json::from_value(json!({
            "event": "start",
            "tenant_id": "tenant-1",
            "caller": "+33612345678",
        }))
        .unwrap();
        assert!(matches!(start, InboundFrame::Start { .. }));

        let media: InboundFrame = serde_json::from_value(json!({
            "event": "media",
            "payload": "AAAA",
        }))
        .unwrap();
        assert!(matches!(
            media,
            InboundFrame::Media { timestamp_ms: 0, .. }
        ));

        let dtmf: InboundFrame =
            serde_json::from_value(json!({"event": "dtmf", "digit": "0"})).unwrap();
        assert!(matches!(dtmf, InboundFrame::Dtmf { digit: '0' }));
    }

    #[test]
    fn test_outbound_frames_are_tagged() {
        let frame = serde_json::to_value(OutboundFrame::Play {
            payload: "AAAA".into(),
        })
        .unwrap();
        assert_eq!(frame["event"], "play");

        let frame = serde_json::to_value(OutboundFrame::Hangup).unwrap();
        assert_eq!(frame["event"], "hangup");
    }
}
