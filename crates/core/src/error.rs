//! Error types for the Ambit domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Ambit operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion backend errors ---
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    // --- Context log misuse ---
    #[error("Context state error: {0}")]
    State(#[from] StateError),

    // --- Tool dispatch errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failure of a single call to the completion backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Terminal failure of the proposal engine for one cycle.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("Backend failed after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: ProviderError },

    #[error("Backend returned a non-conforming proposal: {0}")]
    NonConforming(String),
}

/// Contract violations on the context log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("No event has been added to the context log")]
    NoTurn,

    #[error("The last turn already has a response")]
    ResponseAlreadySet,

    #[error("The last turn already has user feedback")]
    FeedbackAlreadySet,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid operation string: {0}")]
    InvalidOperation(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Tool service request to {endpoint} failed: {reason}")]
    Http { endpoint: String, reason: String },

    #[error("Tool service returned HTTP {status_code} for {endpoint}")]
    Status { endpoint: String, status_code: u16 },

    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },
}
