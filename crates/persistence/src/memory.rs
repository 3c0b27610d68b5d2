//! In-memory store implementation
//!
//! Backs tests and development deployments. A single `MemoryStore` implements
//! every store trait; [`MemoryStore::stores`] hands out one `Stores` bundle
//! sharing the same state.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use parking_lot::RwLock;

use omniline_core::{Conversation, Turn};

use crate::error::StoreError;
use crate::records::{Appointment, CatalogItem, CatalogQuery, Prospect};
use crate::stores::{
    AppointmentStore, CatalogStore, ConversationStore, ProspectStore, Stores, TurnStore,
};

#[derive(Default)]
struct Inner {
    conversations: HashMap<String, Conversation>,
    turns: Vec<Turn>,
    catalog: Vec<CatalogItem>,
    appointments: Vec<Appointment>,
    prospects: Vec<Prospect>,
}

/// Shared in-memory state implementing every store contract.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    /// When set, every write fails with this message. Used by tests to
    /// exercise the best-effort persistence paths.
    fail_writes: RwLock<Option<String>>,
    /// When set, catalog and availability reads fail with this message.
    fail_reads: RwLock<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Bundle this store as every store handle.
    pub fn stores(self: &Arc<Self>) -> Stores {
        Stores {
            conversations: self.clone(),
            turns: self.clone(),
            catalog: self.clone(),
            appointments: self.clone(),
            prospects: self.clone(),
        }
    }

    /// Seed the catalog with items (development and tests).
    pub fn seed_catalog(&self, items: Vec<CatalogItem>) {
        self.inner.write().catalog.extend(items);
    }

    /// Make every subsequent write fail (tests only).
    pub fn fail_writes_with(&self, message: impl Into<String>) {
        *self.fail_writes.write() = Some(message.into());
    }

    /// Restore normal write behavior.
    pub fn heal_writes(&self) {
        *self.fail_writes.write() = None;
    }

    /// Make catalog and availability reads fail (tests only).
    pub fn fail_reads_with(&self, message: impl Into<String>) {
        *self.fail_reads.write() = Some(message.into());
    }

    pub fn appointment_count(&self) -> usize {
        self.inner.read().appointments.len()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        match &*self.fail_writes.read() {
            Some(message) => Err(StoreError::Query(message.clone())),
            None => Ok(()),
        }
    }

    fn check_readable(&self) -> Result<(), StoreError> {
        match &*self.fail_reads.read() {
            Some(message) => Err(StoreError::Query(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create(&self, conversation: Conversation) -> Result<(), StoreError> {
        self.check_writable()?;
        self.inner
            .write()
            .conversations
            .insert(conversation.id.clone(), conversation);
        Ok(())
    }

    async fn get(&self, tenant_id: &str, id: &str) -> Result<Option<Conversation>, StoreError> {
        let inner = self.inner.read();
        Ok(inner
            .conversations
            .get(id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn update(&self, conversation: &Conversation) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        if !inner.conversations.contains_key(&conversation.id) {
            return Err(StoreError::ConversationNotFound(conversation.id.clone()));
        }
        inner
            .conversations
            .insert(conversation.id.clone(), conversation.clone());
        Ok(())
    }
}

#[async_trait]
impl TurnStore for MemoryStore {
    async fn append(&self, turn: Turn) -> Result<(), StoreError> {
        self.check_writable()?;
        self.inner.write().turns.push(turn);
        Ok(())
    }

    async fn list(
        &self,
        tenant_id: &str,
        conversation_id: &str,
    ) -> Result<Vec<Turn>, StoreError> {
        let inner = self.inner.read();
        let conversation_tenant_ok = inner
            .conversations
            .get(conversation_id)
            .map(|c| c.tenant_id == tenant_id)
            .unwrap_or(true);
        if !conversation_tenant_ok {
            return Ok(Vec::new());
        }
        Ok(inner
            .turns
            .iter()
            .filter(|t| t.conversation_id == conversation_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn search(
        &self,
        tenant_id: &str,
        query: &CatalogQuery,
    ) -> Result<Vec<CatalogItem>, StoreError> {
        self.check_readable()?;
        let inner = self.inner.read();
        Ok(inner
            .catalog
            .iter()
            .filter(|item| item.tenant_id == tenant_id && query.matches(item))
            .take(query.limit.max(1))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn create_idempotent(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        if let Some(existing) = inner.appointments.iter().find(|a| {
            a.tenant_id == appointment.tenant_id
                && a.conversation_id == appointment.conversation_id
                && a.scheduled_at == appointment.scheduled_at
        }) {
            return Ok(existing.clone());
        }
        inner.appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn booked_times(
        &self,
        tenant_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, StoreError> {
        self.check_readable()?;
        let inner = self.inner.read();
        Ok(inner
            .appointments
            .iter()
            .filter(|a| a.tenant_id == tenant_id && a.date() == date)
            .map(|a| a.scheduled_at.time())
            .collect())
    }
}

#[async_trait]
impl ProspectStore for MemoryStore {
    async fn resolve_or_create(
        &self,
        tenant_id: &str,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Prospect, StoreError> {
        self.check_writable()?;
        let mut inner = self.inner.write();
        if let Some(existing) = inner
            .prospects
            .iter_mut()
            .find(|p| p.tenant_id == tenant_id && p.phone == phone)
        {
            if existing.name.is_none() {
                existing.name = name.map(|n| n.to_string());
            }
            return Ok(existing.clone());
        }

        let prospect = Prospect {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            phone: phone.to_string(),
            name: name.map(|n| n.to_string()),
            created_at: chrono::Utc::now(),
        };
        inner.prospects.push(prospect.clone());
        Ok(prospect)
    }
}
