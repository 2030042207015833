//! Tool abstractions — how approved operations reach the outside world.
//!
//! An operation string `name&k=v&k=v` is parsed into a [`ToolCall`], routed
//! by name to a [`ToolHandler`], and the handler talks to the local tool
//! service through a [`ToolService`] transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use crate::error::ToolError;
use crate::proposal::Proposal;

/// A parsed operation string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Name of the handler to invoke
    pub name: String,

    /// Parameters; duplicate keys keep the last value
    pub params: BTreeMap<String, String>,
}

impl ToolCall {
    /// Parse `name ("&" key "=" value)*`.
    ///
    /// Empty segments (e.g. a trailing `&`) are ignored. A segment without
    /// `=` or with an empty key is rejected.
    pub fn parse(operation: &str) -> Result<Self, ToolError> {
        let mut segments = operation.trim().split('&');
        let name = segments.next().unwrap_or_default().trim();
        if name.is_empty() || name.contains('=') {
            return Err(ToolError::InvalidOperation(format!(
                "missing operation name in '{operation}'"
            )));
        }

        let mut params = BTreeMap::new();
        for segment in segments.filter(|s| !s.is_empty()) {
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                ToolError::InvalidOperation(format!("parameter '{segment}' has no '='"))
            })?;
            if key.is_empty() {
                return Err(ToolError::InvalidOperation(format!(
                    "parameter '{segment}' has an empty key"
                )));
            }
            params.insert(key.to_string(), value.to_string());
        }

        Ok(Self {
            name: name.to_string(),
            params,
        })
    }

    /// Render back to the `name&k=v` wire form (keys sorted).
    pub fn to_operation_string(&self) -> String {
        let mut out = self.name.clone();
        for (k, v) in &self.params {
            out.push('&');
            out.push_str(k);
            out.push('=');
            out.push_str(v);
        }
        out
    }
}

/// Describes an operation to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSpec {
    pub name: String,
    pub description: String,
    /// Parameter name → description
    pub parameters: BTreeMap<String, String>,
    /// An example operation string
    pub format: String,
}

/// A JSON body returned by the tool service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolResponse(pub serde_json::Value);

impl ToolResponse {
    pub fn status(&self) -> Option<&str> {
        self.0.get("status").and_then(|s| s.as_str())
    }

    pub fn is_success(&self) -> bool {
        self.status() == Some("success")
    }

    /// `content` of a successful read.
    pub fn content(&self) -> Option<&str> {
        self.0.get("content").and_then(|s| s.as_str())
    }

    /// `message` of an error (or informational) response.
    pub fn message(&self) -> Option<&str> {
        self.0.get("message").and_then(|s| s.as_str())
    }
}

/// Transport to the tool service: one GET per call.
#[async_trait]
pub trait ToolService: Send + Sync {
    /// Call `endpoint` (e.g. `"search"`) with query parameters.
    async fn call(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> std::result::Result<ToolResponse, ToolError>;
}

/// What the dispatcher knows about the cycle when executing an operation.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    /// The serialized observation of the current turn
    pub event: String,

    /// The proposal that asked for the operation
    pub proposal: Proposal,

    /// The raw operation string
    pub operation: String,
}

/// The result of one handler invocation.
#[derive(Debug)]
pub struct HandlerOutput {
    pub response: ToolResponse,

    /// A fire-and-forget follow-up request, if the handler started one
    pub chained: Option<tokio::task::JoinHandle<std::result::Result<ToolResponse, ToolError>>>,
}

impl HandlerOutput {
    pub fn new(response: ToolResponse) -> Self {
        Self {
            response,
            chained: None,
        }
    }
}

/// A named operation handler.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The operation name this handler serves (e.g. "search").
    fn name(&self) -> &str;

    /// How the operation is presented to the backend.
    fn spec(&self) -> OperationSpec;

    /// Execute a parsed call.
    async fn execute(
        &self,
        call: &ToolCall,
        ctx: &DispatchContext,
    ) -> std::result::Result<HandlerOutput, ToolError>;
}
