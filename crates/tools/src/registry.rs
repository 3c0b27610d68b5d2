//! Tool registry and guarded execution

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use omniline_persistence::Stores;

use crate::appointment::{BookAppointmentTool, CheckAvailabilityTool};
use crate::catalog::SearchCatalogTool;
use crate::schema::{Tool, ToolContext, ToolOutput, ToolSchema};

/// Holds every registered tool and runs them with validation and a
/// per-tool timeout. Execution never fails the caller: contract
/// violations, timeouts and unknown names all come back as error outputs
/// the engine can phrase.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Schemas for the tools a profile enables, in the order given.
    pub fn schemas_for(&self, enabled: &[String]) -> Vec<ToolSchema> {
        enabled
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.schema())
            .collect()
    }

    pub async fn execute(&self, ctx: &ToolContext, name: &str, args: Value) -> ToolOutput {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(tool = name, "unknown tool requested");
            return ToolOutput::error(format!("Outil inconnu: {name}"));
        };

        if let Err(err) = tool.validate(&args) {
            tracing::warn!(tool = name, error = %err, "tool arguments rejected");
            return ToolOutput::error(err.message);
        }

        let timeout = Duration::from_secs(tool.timeout_secs());
        match tokio::time::timeout(timeout, tool.execute(ctx, args)).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                tracing::error!(tool = name, error = %err, "tool execution failed");
                ToolOutput::error(err.message)
            }
            Err(_) => {
                tracing::error!(tool = name, timeout_secs = tool.timeout_secs(), "tool timed out");
                ToolOutput::error(format!("L'outil {name} n'a pas répondu à temps."))
            }
        }
    }
}

/// Registry with the standard business tools wired to the given stores.
pub fn default_registry(stores: &Stores) -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchCatalogTool::new(stores.catalog.clone())));
    registry.register(Arc::new(BookAppointmentTool::new(
        stores.appointments.clone(),
        stores.prospects.clone(),
    )));
    registry.register(Arc::new(CheckAvailabilityTool::new(
        stores.appointments.clone(),
    )));
    Arc::new(registry)
}
