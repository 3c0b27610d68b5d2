//! Live call registry
//!
//! Tracks the handles of running call actors so the HTTP surface can
//! report on them and capacity can be enforced. Closed calls are swept
//! opportunistically on registration and on listing.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use omniline_orchestrator::CallHandle;

use crate::ServerError;

pub struct CallManager {
    calls: RwLock<HashMap<String, Arc<CallHandle>>>,
    max_calls: usize,
}

impl CallManager {
    pub fn new(max_calls: usize) -> Self {
        Self {
            calls: RwLock::new(HashMap::new()),
            max_calls,
        }
    }

    pub fn register(&self, handle: Arc<CallHandle>) -> Result<(), ServerError> {
        let mut calls = self.calls.write();

        if calls.len() >= self.max_calls {
            calls.retain(|_, h| !h.is_closed());
            if calls.len() >= self.max_calls {
                return Err(ServerError::CapacityReached);
            }
        }

        tracing::info!(conversation_id = %handle.conversation_id, "call registered");
        calls.insert(handle.conversation_id.clone(), handle);
        Ok(())
    }

    pub fn remove(&self, conversation_id: &str) {
        if self.calls.write().remove(conversation_id).is_some() {
            tracing::info!(conversation_id, "call removed");
        }
    }

    pub fn get(&self, conversation_id: &str) -> Option<Arc<CallHandle>> {
        self.calls.read().get(conversation_id).cloned()
    }

    /// Number of calls still live.
    pub fn count(&self) -> usize {
        self.sweep_closed();
        self.calls.read().len()
    }

    pub fn list(&self) -> Vec<String> {
        self.sweep_closed();
        self.calls.read().keys().cloned().collect()
    }

    fn sweep_closed(&self) {
        self.calls.write().retain(|_, h| !h.is_closed());
    }
}
