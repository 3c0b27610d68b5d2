//! Asynchronous transcript persistence
//!
//! Turn writes leave the hot path through a bounded queue and happen on a
//! background task with retries. A slow or failing store must never add
//! latency to a live call; a dropped turn is logged and accepted.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use omniline_core::Turn;
use omniline_persistence::TurnStore;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(50);
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub struct TranscriptWriter {
    tx: mpsc::Sender<Turn>,
    task: JoinHandle<()>,
}

impl TranscriptWriter {
    /// Start the writer task. `attempts` is the total number of tries per
    /// turn, minimum 1.
    pub fn spawn(turns: Arc<dyn TurnStore>, queue_size: usize, attempts: u32) -> Self {
        let (tx, mut rx) = mpsc::channel::<Turn>(queue_size.max(1));
        let attempts = attempts.max(1);

        let task = tokio::spawn(async move {
            while let Some(turn) = rx.recv().await {
                persist_with_retries(turns.as_ref(), turn, attempts).await;
            }
        });

        Self { tx, task }
    }

    /// Queue a turn without waiting. On a full queue the turn is dropped
    /// and logged; the call goes on.
    pub fn record(&self, turn: Turn) {
        if let Err(err) = self.tx.try_send(turn) {
            let turn = match err {
                mpsc::error::TrySendError::Full(turn) => turn,
                mpsc::error::TrySendError::Closed(turn) => turn,
            };
            tracing::warn!(
                conversation_id = %turn.conversation_id,
                "transcript queue unavailable, dropping turn"
            );
        }
    }

    /// Stop accepting turns and wait for the queue to drain.
    pub async fn close(self) {
        drop(self.tx);
        if tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, self.task)
            .await
            .is_err()
        {
            tracing::warn!("transcript writer did not drain in time");
        }
    }
}

async fn persist_with_retries(turns: &dyn TurnStore, turn: Turn, attempts: u32) {
    for attempt in 1..=attempts {
        match turns.append(turn.clone()).await {
            Ok(()) => return,
            Err(err) if attempt < attempts => {
                tracing::debug!(
                    conversation_id = %turn.conversation_id,
                    attempt,
                    error = %err,
                    "turn write failed, retrying"
                );
                tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
            }
            Err(err) => {
                tracing::warn!(
                    conversation_id = %turn.conversation_id,
                    attempts,
                    error = %err,
                    "turn write abandoned"
                );
            }
        }
    }
}
