//! Operation handlers for Ambit.
//!
//! Handlers turn an approved operation into requests against the local
//! tool service: open a search, ask the chatbot, read a file (and let the
//! chatbot act on it), rename a file.

pub mod chat;
pub mod dispatcher;
pub mod read;
pub mod rename;
pub mod search;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{BackendCredentials, ChatHandler};
pub use dispatcher::{ActionDispatcher, DispatchOutcome};
pub use read::ReadHandler;
pub use rename::RenameFileHandler;
pub use search::SearchHandler;
pub use service::HttpToolService;

use ambit_core::tool::ToolService;
use std::sync::Arc;

/// Create a dispatcher with all built-in handlers, minus `disabled` ones.
pub fn default_dispatcher(
    service: Arc<dyn ToolService>,
    credentials: BackendCredentials,
    disabled: &[String],
) -> ActionDispatcher {
    let mut dispatcher = ActionDispatcher::new();
    dispatcher.register(Arc::new(SearchHandler::new(service.clone())));
    dispatcher.register(Arc::new(ChatHandler::new(service.clone(), credentials.clone())));
    dispatcher.register(Arc::new(ReadHandler::new(service.clone(), credentials)));
    dispatcher.register(Arc::new(RenameFileHandler::new(service)));

    for name in disabled {
        if dispatcher.unregister(name).is_none() {
            tracing::warn!(operation = %name, "Cannot disable unknown operation");
        }
    }
    dispatcher
}
