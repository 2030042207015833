//! Search handler — opens a browser search through the tool service.

use async_trait::async_trait;
use ambit_core::error::ToolError;
use ambit_core::tool::{DispatchContext, HandlerOutput, OperationSpec, ToolCall, ToolHandler, ToolService};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct SearchHandler {
    service: Arc<dyn ToolService>,
}

impl SearchHandler {
    pub fn new(service: Arc<dyn ToolService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for SearchHandler {
    fn name(&self) -> &str {
        "search"
    }

    fn spec(&self) -> OperationSpec {
        OperationSpec {
            name: "search".into(),
            description: "Open a browser tab with the results of a web search.".into(),
            parameters: BTreeMap::from([
                ("query".into(), "The search query".into()),
                (
                    "search_engine".into(),
                    "The search engine to use (defaults to bing)".into(),
                ),
            ]),
            format: "search&query=<query>&search_engine=bing".into(),
        }
    }

    async fn execute(
        &self,
        call: &ToolCall,
        _ctx: &DispatchContext,
    ) -> Result<HandlerOutput, ToolError> {
        let response = self.service.call("search", &call.params).await?;
        Ok(HandlerOutput::new(response))
    }
}
