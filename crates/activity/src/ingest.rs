//! Raw event ingestion — newline-delimited JSON from any async reader.
//!
//! Each line is one of:
//! - `{"text": "..."}`: typed text, fed to the text accumulator
//! - `{"feedback": "..."}`: user feedback on the latest turn
//! - any other JSON object: a raw activity event

use ambit_core::observation::RawEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One classified input line.
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    Text(String),
    Feedback(String),
    Event(RawEvent),
}

impl InputLine {
    /// Classify one line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, serde_json::Error> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let value: serde_json::Value = serde_json::from_str(line)?;
        let single_string = |key: &str| match value.as_object() {
            Some(obj) if obj.len() == 1 => obj.get(key).and_then(|v| v.as_str()).map(String::from),
            _ => None,
        };

        if let Some(text) = single_string("text") {
            return Ok(Some(Self::Text(text)));
        }
        if let Some(feedback) = single_string("feedback") {
            return Ok(Some(Self::Feedback(feedback)));
        }
        Ok(Some(Self::Event(value)))
    }
}

/// Read `reader` line by line until EOF, forwarding classified lines.
///
/// Unparseable lines are logged and skipped.
pub fn spawn_reader<R>(reader: R) -> (mpsc::Receiver<InputLine>, tokio::task::JoinHandle<()>)
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(64);

    let handle = tokio::spawn(async move {
        let mut lines = reader.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match InputLine::parse(&line) {
                    Ok(Some(input)) => {
                        if tx.send(input).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => continue,
                    Err(e) => warn!(error = %e, "Skipping malformed input line"),
                },
                Ok(None) => {
                    debug!("Input closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    break;
                }
            }
        }
    });

    (rx, handle)
}

/// Read stdin until EOF.
pub fn spawn_stdin_reader() -> (mpsc::Receiver<InputLine>, tokio::task::JoinHandle<()>) {
    spawn_reader(tokio::io::BufReader::new(tokio::io::stdin()))
}
