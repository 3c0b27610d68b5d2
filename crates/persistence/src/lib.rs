//! Persistence layer for the omniline voice orchestrator
//!
//! Defines the tenant-scoped store contracts consumed by the channel
//! switcher, the tool executor, and the orchestrator, plus an in-memory
//! implementation used in tests and development. Every query takes a tenant
//! id; returning another tenant's rows is a correctness violation, not an
//! error to be handled.

pub mod error;
pub mod memory;
pub mod records;
pub mod stores;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use records::{Appointment, AppointmentStatus, CatalogItem, CatalogQuery, Prospect};
pub use stores::{
    AppointmentStore, CatalogStore, ConversationStore, ProspectStore, Stores, TurnStore,
};
