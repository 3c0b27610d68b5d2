//! Switch validation and execution

use std::sync::Arc;

use thiserror::Error;

use omniline_core::{Channel, ChannelSwitch, Conversation, Turn};
use omniline_persistence::{ConversationStore, StoreError, TurnStore};

/// Any channel can reach any other; only staying put is rejected.
pub fn can_switch(from: Channel, to: Channel) -> bool {
    from != to
}

#[derive(Debug, Error)]
pub enum SwitchError {
    #[error("conversation {0} not found")]
    NotFound(String),

    #[error("conversation {0} is closed")]
    Closed(String),

    #[error("cannot switch from {from} to {to}")]
    NotAllowed { from: Channel, to: Channel },

    #[error("conversation is on {actual}, not {expected}")]
    WrongChannel { expected: Channel, actual: Channel },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A committed switch: the updated conversation plus the history entry
/// just recorded.
#[derive(Debug, Clone)]
pub struct SwitchOutcome {
    pub conversation: Conversation,
    pub switch: ChannelSwitch,
}

pub struct ChannelSwitcher {
    conversations: Arc<dyn ConversationStore>,
    turns: Arc<dyn TurnStore>,
}

impl ChannelSwitcher {
    pub fn new(conversations: Arc<dyn ConversationStore>, turns: Arc<dyn TurnStore>) -> Self {
        Self {
            conversations,
            turns,
        }
    }

    /// Move a live conversation from `from` to `to`.
    ///
    /// The conversation record is the source of truth: the switch is only
    /// real once `update` succeeds. The system turn noting the move is
    /// best-effort; a transcript gap is acceptable, a conversation stuck
    /// between channels is not.
    pub async fn switch(
        &self,
        tenant_id: &str,
        conversation_id: &str,
        from: Channel,
        to: Channel,
        reason: &str,
    ) -> Result<SwitchOutcome, SwitchError> {
        if !can_switch(from, to) {
            return Err(SwitchError::NotAllowed { from, to });
        }

        let mut conversation = self
            .conversations
            .get(tenant_id, conversation_id)
            .await?
            .ok_or_else(|| SwitchError::NotFound(conversation_id.to_string()))?;

        if !conversation.is_active() {
            return Err(SwitchError::Closed(conversation_id.to_string()));
        }
        if conversation.current_channel != from {
            return Err(SwitchError::WrongChannel {
                expected: from,
                actual: conversation.current_channel,
            });
        }

        conversation.switch_to(to, reason);
        self.conversations.update(&conversation).await?;

        let switch = conversation
            .switches
            .last()
            .cloned()
            .ok_or_else(|| StoreError::InvalidData("switch history empty after switch".into()))?;

        tracing::info!(
            conversation_id,
            %from,
            %to,
            reason,
            "conversation switched channel"
        );

        let note = Turn::system(
            conversation_id,
            to,
            format!("Conversation déplacée de {from} vers {to} ({reason})"),
        );
        if let Err(err) = self.turns.append(note).await {
            tracing::warn!(conversation_id, error = %err, "switch note not persisted");
        }

        Ok(SwitchOutcome {
            conversation,
            switch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omniline_persistence::MemoryStore;

    fn switcher(store: &Arc<MemoryStore>) -> ChannelSwitcher {
        ChannelSwitcher::new(store.clone(), store.clone())
    }

    async fn seeded_conversation(store: &Arc<MemoryStore>) -> Conversation {
        let conversation = Conversation::new("tenant-1", "+33612345678", Channel::Voice);
        store.create(conversation.clone()).await.unwrap();
        conversation
    }

    #[test]
    fn test_only_self_switches_are_rejected() {
        for from in Channel::ALL {
            for to in Channel::ALL {
                assert_eq!(can_switch(from, to), from != to);
            }
        }
    }

    #[tokio::test]
    async fn test_switch_updates_record_and_history() {
        let store = MemoryStore::new();
        let conversation = seeded_conversation(&store).await;

        let outcome = switcher(&store)
            .switch("tenant-1", &conversation.id, Channel::Voice, Channel::Sms, "confirmation écrite")
            .await
            .unwrap();

        assert_eq!(outcome.conversation.current_channel, Channel::Sms);
        assert!(outcome.conversation.active_channels.contains(&Channel::Voice));
        assert!(outcome.conversation.active_channels.contains(&Channel::Sms));
        assert_eq!(outcome.switch.from, Channel::Voice);
        assert_eq!(outcome.switch.to, Channel::Sms);

        let stored = store.get("tenant-1", &conversation.id).await.unwrap().unwrap();
        assert_eq!(stored.current_channel, Channel::Sms);
        assert_eq!(stored.switches.len(), 1);

        let turns = store.list("tenant-1", &conversation.id).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert!(turns[0].content.contains("voice"));
    }

    #[tokio::test]
    async fn test_self_switch_fails_without_touching_the_store() {
        let store = MemoryStore::new();
        let conversation = seeded_conversation(&store).await;

        let err = switcher(&store)
            .switch("tenant-1", &conversation.id, Channel::Voice, Channel::Voice, "loop")
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchError::NotAllowed { .. }));

        let stored = store.get("tenant-1", &conversation.id).await.unwrap().unwrap();
        assert!(stored.switches.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_conversation() {
        let store = MemoryStore::new();
        let err = switcher(&store)
            .switch("tenant-1", "missing", Channel::Voice, Channel::Sms, "r")
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stale_from_channel_rejected() {
        let store = MemoryStore::new();
        let conversation = seeded_conversation(&store).await;

        let err = switcher(&store)
            .switch("tenant-1", &conversation.id, Channel::Email, Channel::Sms, "r")
            .await
            .unwrap_err();
        assert!(matches!(err, SwitchError::WrongChannel { .. }));
    }

    struct FailingTurnStore;

    #[async_trait::async_trait]
    impl TurnStore for FailingTurnStore {
        async fn append(&self, _turn: Turn) -> Result<(), StoreError> {
            Err(StoreError::Query("turns down".into()))
        }

        async fn list(
            &self,
            _tenant_id: &str,
            _conversation_id: &str,
        ) -> Result<Vec<Turn>, StoreError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_failed_note_does_not_fail_the_switch() {
        let store = MemoryStore::new();
        let conversation = seeded_conversation(&store).await;

        let switcher = ChannelSwitcher::new(store.clone(), Arc::new(FailingTurnStore));
        let outcome = switcher
            .switch("tenant-1", &conversation.id, Channel::Voice, Channel::Whatsapp, "r")
            .await
            .unwrap();
        assert_eq!(outcome.conversation.current_channel, Channel::Whatsapp);

        let stored = store.get("tenant-1", &conversation.id).await.unwrap().unwrap();
        assert_eq!(stored.current_channel, Channel::Whatsapp);
    }
}
