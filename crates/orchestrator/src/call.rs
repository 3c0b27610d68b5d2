//! The per-call actor
//!
//! `spawn_call` creates the conversation record and a dedicated task that
//! owns all mutable call state. Inputs arrive on a bounded queue; a timer
//! tick drives end-of-utterance detection. Because the actor awaits each
//! turn to completion before reading the next input, a turn can never
//! overlap itself and no reentrancy guard is needed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;

use omniline_config::{AgentProfile, OrchestratorConfig};
use omniline_core::{ClosedReason, Conversation, Transcription, Turn};
use omniline_dialogue::{DialogueEngine, DialogueSession, EngineReply, HistoryRole, IntentDetector};
use omniline_persistence::Stores;
use omniline_pipeline::{split_outbound, AudioBuffer, SpeechSynthesizer, SpeechToText, SpokenReply, VoiceSelection};
use omniline_tools::{ToolContext, ToolRegistry};

use crate::playback::Playback;
use crate::writer::TranscriptWriter;
use crate::CallError;

/// DTMF escape hatches: callers who cannot or will not talk their way out.
const DTMF_TRANSFER: char = '0';
const DTMF_END: char = '9';

/// Everything the transport can feed a call.
#[derive(Debug, Clone)]
pub enum CallInput {
    /// One inbound audio chunk, base64 payload.
    Media { payload: String, timestamp_ms: u64 },
    /// A keypad digit.
    Dtmf(char),
    /// The remote side ended the call.
    Stop { reason: String },
}

/// Call lifecycle. Transitions only ever move forward out of `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Conversation created, greeting not yet delivered.
    Initializing,
    /// Accumulating caller audio.
    Listening,
    /// Running transcription, dialogue and tools for one utterance.
    Processing,
    /// Delivering the assistant reply.
    Speaking,
    /// Caller is being handed to a human; input no longer processed.
    TransferPending,
    /// Terminal.
    Closed,
}

/// Observable call events, for transports and tests.
#[derive(Debug, Clone)]
pub enum CallEvent {
    StateChanged(CallState),
    /// An utterance was accepted for processing.
    CallerSaid(String),
    /// A reply was delivered (or queued for delivery).
    AssistantSaid(String),
    Closed(ClosedReason),
}

/// External collaborators a call runs against. All shared, all owned by
/// the process, handed to each actor by reference count.
#[derive(Clone)]
pub struct CallCollaborators {
    pub stt: Arc<dyn SpeechToText>,
    pub synthesizer: Arc<SpeechSynthesizer>,
    pub engine: Arc<dyn DialogueEngine>,
    pub tools: Arc<ToolRegistry>,
    pub stores: Stores,
    pub playback: Arc<dyn Playback>,
}

/// Handle kept by the transport side.
pub struct CallHandle {
    pub conversation_id: String,
    input_tx: mpsc::Sender<CallInput>,
    event_tx: broadcast::Sender<CallEvent>,
    state_rx: watch::Receiver<CallState>,
}

impl CallHandle {
    /// Enqueue an input without waiting. Media on a full queue is dropped;
    /// audio is continuous and the next chunk follows immediately.
    pub fn try_send(&self, input: CallInput) -> Result<(), CallError> {
        self.input_tx.try_send(input).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => CallError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => CallError::Closed,
        })
    }

    pub async fn send(&self, input: CallInput) -> Result<(), CallError> {
        self.input_tx.send(input).await.map_err(|_| CallError::Closed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> CallState {
        *self.state_rx.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.state() == CallState::Closed
    }

    /// Wait for the call to reach `Closed`.
    pub async fn closed(&self) {
        let mut rx = self.state_rx.clone();
        while *rx.borrow() != CallState::Closed {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Create the conversation record and start its actor.
pub async fn spawn_call(
    tenant_id: &str,
    caller: &str,
    profile: AgentProfile,
    config: OrchestratorConfig,
    collaborators: CallCollaborators,
) -> Result<CallHandle, CallError> {
    let conversation = Conversation::new(tenant_id, caller, omniline_core::Channel::Voice);
    collaborators
        .stores
        .conversations
        .create(conversation.clone())
        .await?;

    let conversation_id = conversation.id.clone();
    let (input_tx, input_rx) = mpsc::channel(256);
    let (event_tx, _) = broadcast::channel(100);
    let (state_tx, state_rx) = watch::channel(CallState::Initializing);

    let writer = TranscriptWriter::spawn(
        collaborators.stores.turns.clone(),
        config.write_queue_size,
        config.write_attempts,
    );

    let actor = CallActor {
        conversation,
        session: DialogueSession::new(profile.persona.clone(), profile.language.clone()),
        buffer: AudioBuffer::new(config.buffer_capacity),
        last_transcript: None,
        intents: IntentDetector,
        profile,
        config,
        collaborators,
        writer: Some(writer),
        event_tx: event_tx.clone(),
        state_tx,
    };

    tokio::spawn(actor.run(input_rx));

    Ok(CallHandle {
        conversation_id,
        input_tx,
        event_tx,
        state_rx,
    })
}

struct CallActor {
    conversation: Conversation,
    session: DialogueSession,
    buffer: AudioBuffer,
    /// Last utterance accepted for processing; consecutive duplicates are
    /// echo artifacts, not new intent.
    last_transcript: Option<String>,
    intents: IntentDetector,
    profile: AgentProfile,
    config: OrchestratorConfig,
    collaborators: CallCollaborators,
    writer: Option<TranscriptWriter>,
    event_tx: broadcast::Sender<CallEvent>,
    state_tx: watch::Sender<CallState>,
}

/// How one step of the actor loop left the call.
enum Flow {
    Continue,
    Ended,
}

impl CallActor {
    async fn run(mut self, mut input_rx: mpsc::Receiver<CallInput>) {
        tracing::info!(
            conversation_id = %self.conversation.id,
            caller = %self.conversation.caller,
            "call started"
        );

        // Greet before listening. A dead transport at this point ends the
        // call immediately.
        if let Flow::Ended = self.speak(&self.profile.greeting.clone()).await {
            self.finish(ClosedReason::Error).await;
            return;
        }
        self.set_state(CallState::Listening);

        let mut tick = tokio::time::interval(Duration::from_millis(self.config.silence_poll_ms));
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let flow = tokio::select! {
                input = input_rx.recv() => match input {
                    Some(input) => self.handle_input(input).await,
                    // Transport handle dropped without a Stop.
                    None => {
                        self.finish(ClosedReason::Error).await;
                        return;
                    }
                },
                _ = tick.tick() => self.handle_tick().await,
            };

            if let Flow::Ended = flow {
                return;
            }
        }
    }

    async fn handle_input(&mut self, input: CallInput) -> Flow {
        match input {
            CallInput::Media { payload, timestamp_ms } => {
                self.buffer.push(payload, timestamp_ms);
                Flow::Continue
            }
            CallInput::Dtmf(digit) => self.handle_dtmf(digit).await,
            CallInput::Stop { reason } => {
                tracing::info!(
                    conversation_id = %self.conversation.id,
                    reason,
                    "remote ended the call"
                );
                self.finish(ClosedReason::Completed).await;
                Flow::Ended
            }
        }
    }

    async fn handle_dtmf(&mut self, digit: char) -> Flow {
        self.record_turn(Turn::system(
            &self.conversation.id,
            self.conversation.current_channel,
            format!("DTMF {digit}"),
        ));
        match digit {
            DTMF_TRANSFER => {
                let phrase = self.profile.transfer_phrase.clone();
                if let Flow::Continue = self.speak(&phrase).await {
                    self.transfer().await;
                }
                Flow::Ended
            }
            DTMF_END => {
                let phrase = self.profile.goodbye_phrase.clone();
                if let Flow::Continue = self.speak(&phrase).await {
                    self.hang_up_after_goodbye().await;
                }
                Flow::Ended
            }
            other => {
                tracing::debug!(conversation_id = %self.conversation.id, digit = %other, "ignoring dtmf");
                Flow::Continue
            }
        }
    }

    async fn handle_tick(&mut self) -> Flow {
        let threshold = Duration::from_millis(self.config.silence_threshold_ms);
        if !self.buffer.silence_detected(threshold) {
            return Flow::Continue;
        }

        let audio = self.buffer.continuous();
        self.buffer.clear();
        if audio.is_empty() {
            return Flow::Continue;
        }

        self.process_turn(audio).await
    }

    /// One full caller turn: transcription, intents, dialogue, tools,
    /// reply. Collaborator failures degrade to the fallback phrase; only a
    /// dead transport ends the call.
    async fn process_turn(&mut self, audio: Vec<u8>) -> Flow {
        self.set_state(CallState::Processing);

        let transcription = self.transcribe(&audio).await;
        let text = match transcription {
            Some(t) if !t.is_empty() => t.text.trim().to_string(),
            Some(_) => {
                self.set_state(CallState::Listening);
                return Flow::Continue;
            }
            None => {
                let phrase = self.profile.fallback_phrase.clone();
                let flow = self.speak(&phrase).await;
                if let Flow::Continue = flow {
                    self.set_state(CallState::Listening);
                }
                return flow;
            }
        };

        if self.last_transcript.as_deref() == Some(text.as_str()) {
            tracing::debug!(conversation_id = %self.conversation.id, "duplicate utterance skipped");
            self.set_state(CallState::Listening);
            return Flow::Continue;
        }
        self.last_transcript = Some(text.clone());

        let _ = self.event_tx.send(CallEvent::CallerSaid(text.clone()));
        self.record_turn(
            Turn::inbound(
                &self.conversation.id,
                self.conversation.current_channel,
                text.clone(),
            )
            .with_transcript(text.clone()),
        );
        self.session.record(HistoryRole::Caller, text.clone());

        // Escape intents bypass the engine entirely.
        if self.intents.wants_transfer(&text) {
            let phrase = self.profile.transfer_phrase.clone();
            if let Flow::Continue = self.speak(&phrase).await {
                self.transfer().await;
            }
            return Flow::Ended;
        }
        if self.intents.wants_end(&text) {
            let phrase = self.profile.goodbye_phrase.clone();
            if let Flow::Continue = self.speak(&phrase).await {
                self.hang_up_after_goodbye().await;
            }
            return Flow::Ended;
        }

        let reply = self.generate_reply(&text).await;
        self.session.record(HistoryRole::Assistant, reply.clone());
        self.record_turn(Turn::outbound(
            &self.conversation.id,
            self.conversation.current_channel,
            reply.clone(),
        ));

        let flow = self.speak(&reply).await;
        if let Flow::Continue = flow {
            self.set_state(CallState::Listening);
        }
        flow
    }

    async fn transcribe(&self, audio: &[u8]) -> Option<Transcription> {
        let timeout = Duration::from_millis(self.config.stt_timeout_ms);
        let attempt = self
            .collaborators
            .stt
            .transcribe(audio, &self.profile.language);

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(transcription)) => Some(transcription),
            Ok(Err(err)) => {
                tracing::warn!(conversation_id = %self.conversation.id, error = %err, "transcription failed");
                None
            }
            Err(_) => {
                tracing::warn!(conversation_id = %self.conversation.id, "transcription timed out");
                None
            }
        }
    }

    /// Ask the engine for a reply; run at most one tool and fold its
    /// result back with exactly one resumption. Any engine failure yields
    /// the fallback phrase.
    async fn generate_reply(&mut self, text: &str) -> String {
        let timeout = Duration::from_millis(self.config.dialogue_timeout_ms);
        let schemas = self
            .collaborators
            .tools
            .schemas_for(&self.profile.enabled_tools);

        let reply = tokio::time::timeout(
            timeout,
            self.collaborators.engine.respond(&self.session, text, &schemas),
        )
        .await;

        let reply = match reply {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                tracing::warn!(conversation_id = %self.conversation.id, error = %err, "engine failed");
                return self.profile.fallback_phrase.clone();
            }
            Err(_) => {
                tracing::warn!(conversation_id = %self.conversation.id, "engine timed out");
                return self.profile.fallback_phrase.clone();
            }
        };

        let request = match reply {
            EngineReply::Text(text) => return text,
            EngineReply::ToolCall(request) => request,
        };

        tracing::info!(
            conversation_id = %self.conversation.id,
            tool = %request.name,
            "engine requested a tool"
        );

        let ctx = ToolContext {
            tenant_id: self.conversation.tenant_id.clone(),
            conversation_id: self.conversation.id.clone(),
            caller: self.conversation.caller.clone(),
        };
        let output = self
            .collaborators
            .tools
            .execute(&ctx, &request.name, request.arguments.clone())
            .await;

        if let Some(result_text) = output.first_text() {
            self.session.record(HistoryRole::Tool, result_text);
        }

        let resumed = tokio::time::timeout(
            timeout,
            self.collaborators
                .engine
                .resume_with_tool(&self.session, &request, &output),
        )
        .await;

        match resumed {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                tracing::warn!(conversation_id = %self.conversation.id, error = %err, "engine resume failed");
                self.profile.fallback_phrase.clone()
            }
            Err(_) => {
                tracing::warn!(conversation_id = %self.conversation.id, "engine resume timed out");
                self.profile.fallback_phrase.clone()
            }
        }
    }

    /// Deliver one reply. Synthesis degrades to text; a playback failure
    /// is fatal and closes the call with an error.
    async fn speak(&mut self, text: &str) -> Flow {
        self.set_state(CallState::Speaking);

        let voice = VoiceSelection {
            provider: self.profile.voice_provider.clone(),
            voice_id: self.profile.voice_id.clone(),
            language: self.profile.language.clone(),
        };

        let tts_timeout = Duration::from_millis(self.config.tts_timeout_ms);
        let reply = match tokio::time::timeout(
            tts_timeout,
            self.collaborators.synthesizer.speak(text, &voice),
        )
        .await
        {
            Ok(reply) => reply,
            Err(_) => {
                tracing::warn!(conversation_id = %self.conversation.id, "synthesis timed out");
                SpokenReply::Text(text.to_string())
            }
        };

        let delivery = match reply {
            SpokenReply::Audio(audio) => {
                let frames = split_outbound(&audio, self.config.outbound_chunk_bytes);
                self.collaborators.playback.play_audio(frames).await
            }
            SpokenReply::Text(text) => self.collaborators.playback.play_text(&text).await,
        };

        if let Err(err) = delivery {
            tracing::error!(conversation_id = %self.conversation.id, error = %err, "playback failed");
            self.finish(ClosedReason::Error).await;
            return Flow::Ended;
        }

        let _ = self.event_tx.send(CallEvent::AssistantSaid(text.to_string()));
        Flow::Continue
    }

    /// Hand the caller to a human: hold briefly so the transfer phrase
    /// finishes playing, then release the line.
    async fn transfer(&mut self) {
        self.conversation.mark_transfer_pending();
        self.persist_conversation().await;
        self.set_state(CallState::TransferPending);

        tokio::time::sleep(Duration::from_millis(self.config.transfer_grace_ms)).await;

        if let Err(err) = self.collaborators.playback.hangup().await {
            tracing::warn!(conversation_id = %self.conversation.id, error = %err, "hangup failed");
        }
        self.finish(ClosedReason::Transfer).await;
    }

    /// Let the goodbye finish playing, then release the line.
    async fn hang_up_after_goodbye(&mut self) {
        tokio::time::sleep(Duration::from_millis(self.config.playback_grace_ms)).await;

        if let Err(err) = self.collaborators.playback.hangup().await {
            tracing::warn!(conversation_id = %self.conversation.id, error = %err, "hangup failed");
        }
        self.finish(ClosedReason::Completed).await;
    }

    /// Terminal bookkeeping: close the record, flush the transcript queue,
    /// announce the end. Idempotent via the conversation record.
    async fn finish(&mut self, reason: ClosedReason) {
        self.buffer.clear();
        self.conversation.close(reason);
        self.persist_conversation().await;

        if let Some(writer) = self.writer.take() {
            writer.close().await;
        }

        self.set_state(CallState::Closed);
        let _ = self.event_tx.send(CallEvent::Closed(reason));
        tracing::info!(
            conversation_id = %self.conversation.id,
            ?reason,
            "call ended"
        );
    }

    async fn persist_conversation(&self) {
        if let Err(err) = self
            .collaborators
            .stores
            .conversations
            .update(&self.conversation)
            .await
        {
            tracing::warn!(
                conversation_id = %self.conversation.id,
                error = %err,
                "conversation state not persisted"
            );
        }
    }

    fn record_turn(&self, turn: Turn) {
        if let Some(writer) = &self.writer {
            writer.record(turn);
        }
    }

    fn set_state(&self, state: CallState) {
        if *self.state_tx.borrow() != state {
            self.state_tx.send_replace(state);
            let _ = self.event_tx.send(CallEvent::StateChanged(state));
        }
    }
}
