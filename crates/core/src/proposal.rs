//! Proposal — the structured suggestion returned by the completion backend.

use serde::{Deserialize, Serialize};

/// The shape the backend is instructed to answer with.
///
/// Field names are part of the prompt contract and keep their capitalised
/// wire form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// The purpose of the user's last action
    #[serde(rename = "Purpose")]
    pub purpose: String,

    /// The assistant's reasoning about the user's actions
    #[serde(rename = "Thoughts")]
    pub thoughts: String,

    /// A candidate task to help the user, if any
    #[serde(rename = "Proactive_Task", default)]
    pub proactive_task: Option<String>,

    /// Text used to inform the user about the assistance
    #[serde(rename = "Response", default)]
    pub response: Option<String>,

    /// A tool call string `name&k=v&...`
    #[serde(rename = "Operation", default)]
    pub operation: Option<String>,
}

impl Proposal {
    /// The operation to execute, if the proposal asks for one.
    ///
    /// Absent, empty and the literal `"null"` all mean "no action".
    pub fn operation(&self) -> Option<&str> {
        match self.operation.as_deref().map(str::trim) {
            None | Some("") | Some("null") => None,
            Some(op) => Some(op),
        }
    }

    /// Parse a proposal out of raw backend text.
    ///
    /// Accepts a bare JSON object or one wrapped in a Markdown code fence.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(extract_json_object(text))
    }
}

/// Strip Markdown fences and surrounding prose from a JSON object.
fn extract_json_object(text: &str) -> &str {
    let trimmed = text.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
