//! Test doubles shared by the handler tests.

use async_trait::async_trait;
use ambit_core::error::ToolError;
use ambit_core::proposal::Proposal;
use ambit_core::tool::{DispatchContext, ToolResponse, ToolService};
use std::collections::BTreeMap;
use std::sync::Mutex;

type Responder = Box<dyn Fn(&str, &BTreeMap<String, String>) -> serde_json::Value + Send + Sync>;

/// A tool service that records every call and answers from a closure.
pub struct RecordingService {
    calls: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    responder: Responder,
}

impl RecordingService {
    pub fn with(
        responder: impl Fn(&str, &BTreeMap<String, String>) -> serde_json::Value
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            responder: Box::new(responder),
        }
    }

    pub fn succeeding() -> Self {
        Self::with(|_, _| serde_json::json!({"status": "success"}))
    }

    pub fn calls(&self) -> Vec<(String, BTreeMap<String, String>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolService for RecordingService {
    async fn call(
        &self,
        endpoint: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<ToolResponse, ToolError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params.clone()));
        crate::service::validate_body(endpoint, (self.responder)(endpoint, params))
    }
}

pub fn dispatch_context(operation: &str) -> DispatchContext {
    DispatchContext {
        event: r#"{"timestamp":1700000000.0,"duration":15.0,"user_input":"hello","hot-keys":[]}"#
            .into(),
        proposal: Proposal {
            purpose: "reading".into(),
            thoughts: "the user may want a summary".into(),
            proactive_task: Some("summarize the file".into()),
            response: Some("I can summarize it".into()),
            operation: Some(operation.to_string()),
        },
        operation: operation.to_string(),
    }
}
