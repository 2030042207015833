//! Context log — the append-only record of interaction turns.
//!
//! A turn is opened by an observation and later completed by the proposal
//! the backend returned and, optionally, by feedback from the user. Both
//! completions are write-once; nothing is ever removed or reordered.

use serde::{Deserialize, Serialize};
use crate::error::StateError;

/// One observe → respond → feedback unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// The serialized observation that opened this turn
    pub event: String,

    /// The serialized proposal, once the backend has answered
    pub response: Option<String>,

    /// Feedback supplied by the user, if any
    pub user_feedback: Option<String>,
}

impl Turn {
    fn new(event: String) -> Self {
        Self {
            event,
            response: None,
            user_feedback: None,
        }
    }
}

/// Ordered, append-only sequence of turns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextLog {
    turns: Vec<Turn>,
}

impl ContextLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new turn for `event`.
    pub fn append_event(&mut self, event: impl Into<String>) {
        self.turns.push(Turn::new(event.into()));
    }

    /// Record the response on the last turn.
    pub fn set_response(&mut self, text: impl Into<String>) -> Result<(), StateError> {
        let turn = self.turns.last_mut().ok_or(StateError::NoTurn)?;
        if turn.response.is_some() {
            return Err(StateError::ResponseAlreadySet);
        }
        turn.response = Some(text.into());
        Ok(())
    }

    /// Record user feedback on the last turn.
    pub fn set_feedback(&mut self, text: impl Into<String>) -> Result<(), StateError> {
        let turn = self.turns.last_mut().ok_or(StateError::NoTurn)?;
        if turn.user_feedback.is_some() {
            return Err(StateError::FeedbackAlreadySet);
        }
        turn.user_feedback = Some(text.into());
        Ok(())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
