//! Proposal gate — at most one proposal cycle in flight.
//!
//! A cycle takes the `agent.propose` lock without waiting, then waits for
//! the `activity` lock. If the proposal lock is taken the cycle is dropped.
//! Both locks are held until the returned [`GatePermit`] is dropped.

use ambit_core::bus::{Tag, TagBus};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Both gate locks. Fields drop in declaration order, so the inner
/// activity lock is released before the outer proposal lock.
#[must_use = "the gate is released when the permit is dropped"]
pub struct GatePermit {
    _activity: OwnedMutexGuard<()>,
    _proposal: OwnedMutexGuard<()>,
}

#[derive(Clone)]
pub struct ProposalGate {
    bus: Arc<TagBus>,
}

impl ProposalGate {
    pub fn new(bus: Arc<TagBus>) -> Self {
        Self { bus }
    }

    /// Enter the gate, or `None` when another cycle holds it.
    pub async fn try_enter(&self) -> Option<GatePermit> {
        let proposal = self.bus.try_lock(Tag::Propose)?;
        let activity = self.bus.lock(Tag::Activity).await;
        Some(GatePermit {
            _activity: activity,
            _proposal: proposal,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.bus.is_locked(Tag::Propose)
    }
}
