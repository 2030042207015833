//! Chat handler — forwards the current event context to the tool service's
//! chat endpoint, along with the backend credentials.

use async_trait::async_trait;
use ambit_core::error::ToolError;
use ambit_core::tool::{
    DispatchContext, HandlerOutput, OperationSpec, ToolCall, ToolHandler, ToolResponse,
    ToolService,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Completion backend credentials handed to the tool service's `/chat`.
#[derive(Clone, Default)]
pub struct BackendCredentials {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl std::fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl BackendCredentials {
    pub fn from_config(config: &ambit_config::AppConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: Some(config.base_url.clone()),
            model: Some(config.model.clone()),
        }
    }

    /// Write the credentials into a `/chat` query, skipping absent ones.
    pub fn apply(&self, params: &mut BTreeMap<String, String>) {
        for (key, value) in [
            ("api_key", &self.api_key),
            ("base_url", &self.base_url),
            ("model", &self.model),
        ] {
            if let Some(value) = value {
                params.insert(key.to_string(), value.clone());
            }
        }
    }
}

/// Send `messages` to `/chat` with credentials injected.
pub(crate) async fn send_chat(
    service: &dyn ToolService,
    credentials: &BackendCredentials,
    mut params: BTreeMap<String, String>,
    messages: String,
) -> Result<ToolResponse, ToolError> {
    credentials.apply(&mut params);
    params.insert("messages".into(), messages);
    service.call("chat", &params).await
}

pub struct ChatHandler {
    service: Arc<dyn ToolService>,
    credentials: BackendCredentials,
}

impl ChatHandler {
    pub fn new(service: Arc<dyn ToolService>, credentials: BackendCredentials) -> Self {
        Self {
            service,
            credentials,
        }
    }
}

#[async_trait]
impl ToolHandler for ChatHandler {
    fn name(&self) -> &str {
        "chat"
    }

    fn spec(&self) -> OperationSpec {
        OperationSpec {
            name: "chat".into(),
            description: "Ask the chatbot to help with what the user is doing; the current \
                          events are sent as context and the answer is copied to the clipboard."
                .into(),
            parameters: BTreeMap::new(),
            format: "chat".into(),
        }
    }

    async fn execute(
        &self,
        call: &ToolCall,
        ctx: &DispatchContext,
    ) -> Result<HandlerOutput, ToolError> {
        // The event is already JSON; it travels as a JSON string literal.
        let messages = serde_json::to_string(&ctx.event).map_err(|e| {
            ToolError::InvalidOperation(format!("cannot encode event context: {e}"))
        })?;
        let response =
            send_chat(self.service.as_ref(), &self.credentials, call.params.clone(), messages)
                .await?;
        Ok(HandlerOutput::new(response))
    }
}
