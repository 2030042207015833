//! Rename handler.

use async_trait::async_trait;
use ambit_core::error::ToolError;
use ambit_core::tool::{
    DispatchContext, HandlerOutput, OperationSpec, ToolCall, ToolHandler, ToolService,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct RenameFileHandler {
    service: Arc<dyn ToolService>,
}

impl RenameFileHandler {
    pub fn new(service: Arc<dyn ToolService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ToolHandler for RenameFileHandler {
    fn name(&self) -> &str {
        "rename_file"
    }

    fn spec(&self) -> OperationSpec {
        OperationSpec {
            name: "rename_file".into(),
            description: "Rename a file in the workspace.".into(),
            parameters: BTreeMap::from([
                ("original_path".into(), "Absolute path of the file".into()),
                ("new_name".into(), "New file name".into()),
            ]),
            format: "rename_file&original_path=<path>&new_name=<name>".into(),
        }
    }

    async fn execute(
        &self,
        call: &ToolCall,
        _ctx: &DispatchContext,
    ) -> Result<HandlerOutput, ToolError> {
        for required in ["original_path", "new_name"] {
            if !call.params.contains_key(required) {
                return Err(ToolError::InvalidOperation(format!(
                    "rename_file requires '{required}'"
                )));
            }
        }
        let response = self.service.call("rename_file", &call.params).await?;
        Ok(HandlerOutput::new(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingService, dispatch_context};

    #[tokio::test]
    async fn forwards_to_rename_endpoint() {
        let service = Arc::new(RecordingService::succeeding());
        let handler = RenameFileHandler::new(service.clone());
        let call = ToolCall::parse("rename_file&original_path=/tmp/a.txt&new_name=b.txt").unwrap();

        handler.execute(&call, &dispatch_context("rename_file")).await.unwrap();

        let calls = service.calls();
        assert_eq!(calls[0].0, "rename_file");
        assert_eq!(calls[0].1["new_name"], "b.txt");
    }

    #[tokio::test]
    async fn missing_param_is_rejected_without_a_call() {
        let service = Arc::new(RecordingService::succeeding());
        let handler = RenameFileHandler::new(service.clone());
        let call = ToolCall::parse("rename_file&original_path=/tmp/a.txt").unwrap();

        let err = handler.execute(&call, &dispatch_context("rename_file")).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidOperation(_)));
        assert!(service.calls().is_empty());
    }
}
