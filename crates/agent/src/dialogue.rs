//! Dialogue assembly — renders the context log into a bounded message
//! sequence for the completion backend.
//!
//! For a log of `t` rendered turns the builder emits `2(t-1)+1` turn
//! messages: a user/assistant pair for every turn but the last, then one
//! user message carrying the newest observation, the instructions and the
//! operations catalogue. The system preamble is kept apart and is never
//! truncated.

use crate::prompt::{INSTRUCTIONS, PLACEHOLDER, SYSTEM_PROMPT};
use ambit_core::context::ContextLog;
use ambit_core::error::StateError;
use ambit_core::message::{Message, Role};
use serde::Serialize;

/// An assembled request: the preamble plus the turn messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dialogue {
    pub system: String,
    pub messages: Vec<Message>,
}

impl Dialogue {
    /// The full sequence sent to the backend, system message first.
    pub fn to_request_messages(&self) -> Vec<Message> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(Message::system(self.system.clone()));
        out.extend(self.messages.iter().cloned());
        out
    }
}

// Field order is part of the prompt; serde_json keeps declaration order.
#[derive(Serialize)]
struct HistoryContent<'a> {
    #[serde(rename = "Observation")]
    observation: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_feedback: Option<Option<&'a str>>,
}

#[derive(Serialize)]
struct CurrentContent<'a> {
    #[serde(rename = "Observation")]
    observation: &'a str,
    #[serde(rename = "Instructions")]
    instructions: &'a str,
    #[serde(rename = "Operations")]
    operations: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_feedback: Option<Option<&'a str>>,
}

/// Builds dialogues from the context log.
#[derive(Debug, Clone)]
pub struct DialogueBuilder {
    system: String,
    /// Recent user messages keeping their content; `<= 0` keeps all
    remain_content: i64,
    /// Recent turns rendered; `0` renders all
    history_window: usize,
}

impl DialogueBuilder {
    pub fn new() -> Self {
        Self {
            system: SYSTEM_PROMPT.to_string(),
            remain_content: -1,
            history_window: 0,
        }
    }

    pub fn with_remain_content(mut self, remain_content: i64) -> Self {
        self.remain_content = remain_content;
        self
    }

    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    pub fn with_system_prompt(mut self, system: impl Into<String>) -> Self {
        self.system = system.into();
        self
    }

    pub fn from_config(config: &ambit_config::AgentConfig) -> Self {
        Self::new()
            .with_remain_content(config.remain_content)
            .with_history_window(config.history_window)
    }

    /// Render `log` into a dialogue. The log must hold at least one turn.
    pub fn build(
        &self,
        log: &ContextLog,
        operations: &serde_json::Value,
    ) -> Result<Dialogue, StateError> {
        let turns = log.turns();
        let last = turns.len().checked_sub(1).ok_or(StateError::NoTurn)?;
        let first = match self.history_window {
            0 => 0,
            window => turns.len().saturating_sub(window),
        };

        let mut messages = Vec::with_capacity(2 * (last - first) + 1);
        for idx in first..last {
            let turn = &turns[idx];
            let content = HistoryContent {
                observation: &turn.event,
                user_feedback: (idx > 0).then(|| turns[idx - 1].user_feedback.as_deref()),
            };
            messages.push(Message::user(to_json(&content)));
            messages.push(Message::assistant(
                turn.response.clone().unwrap_or_else(|| "null".into()),
            ));
        }

        let current = CurrentContent {
            observation: &turns[last].event,
            instructions: INSTRUCTIONS,
            operations,
            user_feedback: (last > 0).then(|| turns[last - 1].user_feedback.as_deref()),
        };
        messages.push(Message::user(to_json(&current)));

        truncate(&mut messages, self.remain_content);

        Ok(Dialogue {
            system: self.system.clone(),
            messages,
        })
    }
}

impl Default for DialogueBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    // Only borrowed strings and JSON values; serialization cannot fail.
    serde_json::to_string(value).unwrap_or_default()
}

/// Keep the content of the `remain_content` most recent user messages and
/// replace older ones with the placeholder. Assistant messages are never
/// touched. `remain_content <= 0` disables truncation.
pub fn truncate(messages: &mut [Message], remain_content: i64) {
    if remain_content <= 0 {
        return;
    }
    let mut budget = remain_content;
    for message in messages.iter_mut().rev() {
        if message.role != Role::User {
            continue;
        }
        if budget > 0 {
            budget -= 1;
            continue;
        }
        message.content = PLACEHOLDER.to_string();
    }
}
