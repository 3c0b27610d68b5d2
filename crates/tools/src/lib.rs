//! Business tools the dialogue engine can invoke mid-call
//!
//! Tools are the only path from a conversation to tenant data: catalog
//! search, appointment booking, availability lookup. Each tool declares a
//! JSON schema, validates engine-produced arguments strictly before
//! touching a store, and reports business failures as error outputs the
//! engine can phrase an apology from, never as call-fatal errors.

pub mod appointment;
pub mod catalog;
pub mod registry;
pub mod schema;

pub use appointment::{BookAppointmentTool, CheckAvailabilityTool};
pub use catalog::SearchCatalogTool;
pub use registry::{default_registry, ToolRegistry};
pub use schema::{
    ContentBlock, ErrorCode, InputSchema, PropertySchema, Tool, ToolContext, ToolError,
    ToolOutput, ToolSchema,
};
