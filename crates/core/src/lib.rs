//! # Ambit Core
//!
//! Domain types, traits, and error definitions for the Ambit proactive
//! assistant loop. Every other crate in the workspace depends inward on this
//! one.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (completion backend, tool service) is a trait
//! here. Implementations live in their respective crates, which keeps the
//! control loop testable with scripted stand-ins.

pub mod bus;
pub mod context;
pub mod error;
pub mod message;
pub mod observation;
pub mod proposal;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use bus::{Published, Tag, TagBus};
pub use context::{ContextLog, Turn};
pub use error::{BackendError, Error, ProviderError, Result, StateError, ToolError};
pub use message::{Message, Role};
pub use observation::{ActivityStatus, Observation, RawEvent};
pub use proposal::Proposal;
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{
    DispatchContext, HandlerOutput, OperationSpec, ToolCall, ToolHandler, ToolResponse,
    ToolService,
};
