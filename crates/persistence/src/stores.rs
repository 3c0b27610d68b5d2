//! Store contracts
//!
//! The relational store behind these traits is an external collaborator; the
//! core only depends on the contracts. All operations are tenant-scoped and
//! safe to call concurrently from independent call actors: every write is
//! keyed by conversation and tenant, so no cross-conversation locking exists.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use omniline_core::{Conversation, Turn};

use crate::error::StoreError;
use crate::records::{Appointment, CatalogItem, CatalogQuery, Prospect};

/// Conversations: created at call start, mutated by the channel switcher and
/// the orchestrator, closed but never deleted.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create(&self, conversation: Conversation) -> Result<(), StoreError>;

    async fn get(&self, tenant_id: &str, id: &str) -> Result<Option<Conversation>, StoreError>;

    /// Persist the current state of an existing conversation.
    async fn update(&self, conversation: &Conversation) -> Result<(), StoreError>;
}

/// Append-only transcript of turns, ordered by creation.
#[async_trait]
pub trait TurnStore: Send + Sync {
    async fn append(&self, turn: Turn) -> Result<(), StoreError>;

    async fn list(&self, tenant_id: &str, conversation_id: &str)
        -> Result<Vec<Turn>, StoreError>;
}

/// Tenant catalog lookups for the `search_catalog` tool.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Return at most `query.limit` matching items for the tenant.
    async fn search(
        &self,
        tenant_id: &str,
        query: &CatalogQuery,
    ) -> Result<Vec<CatalogItem>, StoreError>;
}

/// Appointment bookings for the `book_appointment` tool.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Create the appointment, or return the existing one when the same
    /// conversation already booked the same slot. This is what makes a
    /// retried tool call safe: the second attempt lands on the first row.
    async fn create_idempotent(
        &self,
        appointment: Appointment,
    ) -> Result<Appointment, StoreError>;

    /// Times already taken for the tenant on the given day.
    async fn booked_times(
        &self,
        tenant_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, StoreError>;
}

/// Counterparty records resolved from caller addresses.
#[async_trait]
pub trait ProspectStore: Send + Sync {
    /// Find the prospect for (tenant, phone), creating it when absent.
    /// A supplied name fills in a missing one but never overwrites.
    async fn resolve_or_create(
        &self,
        tenant_id: &str,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Prospect, StoreError>;
}

/// The full set of store handles a call needs, bundled for wiring.
#[derive(Clone)]
pub struct Stores {
    pub conversations: Arc<dyn ConversationStore>,
    pub turns: Arc<dyn TurnStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub prospects: Arc<dyn ProspectStore>,
}
