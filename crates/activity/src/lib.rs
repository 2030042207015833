//! Activity capture for Ambit.
//!
//! The capture layer itself is external; this crate buffers what it
//! delivers and emits one Observation per interval on the tag bus.

pub mod batcher;
pub mod ingest;

pub use batcher::{ActivityBatcher, BatcherState, spawn_batcher};
pub use ingest::{InputLine, spawn_reader, spawn_stdin_reader};
