//! Action dispatcher — routes an approved operation string to its handler.

use ambit_core::error::ToolError;
use ambit_core::tool::{DispatchContext, HandlerOutput, OperationSpec, ToolCall, ToolHandler};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// What happened to one operation.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// A handler ran and the tool service answered.
    Completed { name: String, output: HandlerOutput },
    /// No handler is registered under `name`; nothing was called.
    Ignored { name: String },
}

impl DispatchOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Completed { name, .. } | Self::Ignored { name } => name,
        }
    }

    pub fn output(&self) -> Option<&HandlerOutput> {
        match self {
            Self::Completed { output, .. } => Some(output),
            Self::Ignored { .. } => None,
        }
    }

    /// Take the handler output, e.g. to await a chained request.
    pub fn into_output(self) -> Option<HandlerOutput> {
        match self {
            Self::Completed { output, .. } => Some(output),
            Self::Ignored { .. } => None,
        }
    }
}

/// Dispatch table keyed by operation name.
pub struct ActionDispatcher {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    strict: bool,
}

impl ActionDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            strict: false,
        }
    }

    /// Reject unknown operation names instead of ignoring them.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Register a handler. Replaces any existing handler with the same name.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) {
        let name = handler.name().to_string();
        self.handlers.insert(name, handler);
    }

    /// Remove a handler by name.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// The operations catalogue offered to the backend, sorted by name.
    pub fn operation_specs(&self) -> Vec<OperationSpec> {
        let mut specs: Vec<OperationSpec> = self.handlers.values().map(|h| h.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    /// The catalogue as a JSON array.
    pub fn operations_json(&self) -> serde_json::Value {
        serde_json::to_value(self.operation_specs()).unwrap_or_default()
    }

    /// Parse `operation` and run the matching handler.
    pub async fn execute(
        &self,
        operation: &str,
        ctx: &DispatchContext,
    ) -> Result<DispatchOutcome, ToolError> {
        let call = ToolCall::parse(operation)?;

        let Some(handler) = self.handlers.get(&call.name) else {
            if self.strict {
                return Err(ToolError::UnknownOperation(call.name));
            }
            warn!(operation = %call.name, "No handler for operation, ignoring");
            return Ok(DispatchOutcome::Ignored { name: call.name });
        };

        info!(tool = %call.name, params = call.params.len(), "Dispatching operation");
        let output = handler.execute(&call, ctx).await?;

        if !output.response.is_success() {
            warn!(
                tool = %call.name,
                status = output.response.status().unwrap_or_default(),
                message = output.response.message().unwrap_or_default(),
                "Tool service reported failure"
            );
        }

        Ok(DispatchOutcome::Completed {
            name: call.name,
            output,
        })
    }
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
