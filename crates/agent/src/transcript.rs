//! Append-only debug transcript of assembled dialogues.
//!
//! Each dialogue is written as one pretty-printed JSON array (system message
//! first) followed by a newline. Writes are fire-and-forget: a failure is
//! logged and the cycle carries on.

use crate::dialogue::Dialogue;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render a dialogue as one transcript block.
    pub fn render(dialogue: &Dialogue) -> Result<String, serde_json::Error> {
        let messages = dialogue.to_request_messages();
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        messages.serialize(&mut ser)?;
        buf.push(b'\n');
        // serde_json only emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Append `dialogue` in the background.
    pub fn record(&self, dialogue: &Dialogue) -> tokio::task::JoinHandle<()> {
        let path = self.path.clone();
        let block = Self::render(dialogue);

        tokio::spawn(async move {
            let block = match block {
                Ok(b) => b,
                Err(e) => {
                    warn!(error = %e, "Failed to render transcript block");
                    return;
                }
            };
            if let Err(e) = append(&path, block.as_bytes()).await {
                warn!(path = %path.display(), error = %e, "Failed to write transcript");
            }
        })
    }
}

async fn append(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await
}
