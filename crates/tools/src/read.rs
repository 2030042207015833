//! Read handler — reads a file through the tool service and, on success,
//! chains a fire-and-forget chat request asking the chatbot to act on the
//! file content.

use async_trait::async_trait;
use ambit_core::error::ToolError;
use ambit_core::tool::{
    DispatchContext, HandlerOutput, OperationSpec, ToolCall, ToolHandler, ToolService,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::chat::{BackendCredentials, send_chat};

pub struct ReadHandler {
    service: Arc<dyn ToolService>,
    credentials: BackendCredentials,
}

impl ReadHandler {
    pub fn new(service: Arc<dyn ToolService>, credentials: BackendCredentials) -> Self {
        Self {
            service,
            credentials,
        }
    }
}

/// The second-stage prompt sent to `/chat` after a successful read.
pub fn follow_up_prompt(ctx: &DispatchContext, content: &str) -> String {
    let background = serde_json::json!({
        "events": ctx.event,
        "func_call": ctx.operation,
        "proposal": ctx.proposal,
    });
    format!(
        "You are a helpful assistant, currently you are dealing with contents in a file.\n\
         Here is the background {background}.\n\
         Here is the content of the file: {content}\n\
         Please accomplish the proposal raised by the agent."
    )
}

#[async_trait]
impl ToolHandler for ReadHandler {
    fn name(&self) -> &str {
        "read"
    }

    fn spec(&self) -> OperationSpec {
        OperationSpec {
            name: "read".into(),
            description: "Read a file starting from a line, then let the chatbot accomplish \
                          the proposed task with its content."
                .into(),
            parameters: BTreeMap::from([
                ("filepath".into(), "Absolute path of the file".into()),
                (
                    "line_number".into(),
                    "Starting line; negative values count from the end (defaults to 1)".into(),
                ),
            ]),
            format: "read&filepath=<path>&line_number=1".into(),
        }
    }

    async fn execute(
        &self,
        call: &ToolCall,
        ctx: &DispatchContext,
    ) -> Result<HandlerOutput, ToolError> {
        let response = self.service.call("read", &call.params).await?;
        if !response.is_success() {
            return Ok(HandlerOutput::new(response));
        }

        let content = response
            .content()
            .ok_or_else(|| ToolError::MalformedResponse {
                endpoint: "read".into(),
                reason: "successful read without 'content'".into(),
            })?;
        let prompt = follow_up_prompt(ctx, content);

        let service = self.service.clone();
        let credentials = self.credentials.clone();
        let chained = tokio::spawn(async move {
            let result = send_chat(service.as_ref(), &credentials, BTreeMap::new(), prompt).await;
            match &result {
                Ok(r) => debug!(status = r.status().unwrap_or_default(), "Chained chat finished"),
                Err(e) => warn!(error = %e, "Chained chat failed"),
            }
            result
        });

        Ok(HandlerOutput {
            response,
            chained: Some(chained),
        })
    }
}
