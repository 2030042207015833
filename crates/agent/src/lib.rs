//! The Ambit control loop.
//!
//! Observation → gate → dialogue → proposal → dispatch → context update.
//! See [`AgentLoop`] for the cycle and [`ProposalEngine`] for the backend
//! envelope.

pub mod dialogue;
pub mod engine;
pub mod gate;
pub mod loop_runner;
pub mod prompt;
pub mod transcript;

pub use dialogue::{Dialogue, DialogueBuilder};
pub use engine::{
    DEFAULT_MAX_CONCURRENCY, ProposalEngine, RetryPolicy, global_semaphore, init_global_semaphore,
};
pub use gate::{GatePermit, ProposalGate};
pub use loop_runner::{AgentLoop, CycleOutcome};
pub use transcript::Transcript;
