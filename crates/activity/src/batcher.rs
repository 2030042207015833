//! Activity batcher — turns a stream of raw events into one Observation per
//! interval.

use ambit_core::bus::{Tag, TagBus};
use ambit_core::observation::{Observation, RawEvent, has_hot_key};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Source name used when publishing observations.
pub const SOURCE: &str = "activity";

/// Where the batcher is in its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatcherState {
    /// Nothing received since the last flush
    Idle,
    /// At least one event or keystroke buffered
    Accumulating,
}

/// Buffers raw events and typed text between flushes.
#[derive(Debug)]
pub struct ActivityBatcher {
    buffer: Vec<RawEvent>,
    text: String,
    last_post_time: DateTime<Utc>,
}

impl ActivityBatcher {
    /// Start a window now.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Start a window at `start`.
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            buffer: Vec::new(),
            text: String::new(),
            last_post_time: start,
        }
    }

    /// Buffer a raw event. Filtering happens at flush time.
    pub fn push(&mut self, event: RawEvent) {
        self.buffer.push(event);
    }

    /// Append typed text to the accumulator.
    pub fn push_text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn state(&self) -> BatcherState {
        if self.buffer.is_empty() && self.text.is_empty() {
            BatcherState::Idle
        } else {
            BatcherState::Accumulating
        }
    }

    /// Start of the current window.
    pub fn last_post_time(&self) -> DateTime<Utc> {
        self.last_post_time
    }

    /// Close the current window and return its Observation.
    pub fn flush(&mut self) -> Observation {
        self.flush_at(Utc::now())
    }

    /// Close the current window at `now`.
    pub fn flush_at(&mut self, now: DateTime<Utc>) -> Observation {
        let start = self.last_post_time;
        let elapsed = (now - start).num_milliseconds().max(0) as f64 / 1000.0;

        let hot_keys = std::mem::take(&mut self.buffer)
            .into_iter()
            .filter(has_hot_key)
            .collect();

        self.last_post_time = now;

        Observation {
            timestamp: start.timestamp_millis() as f64 / 1000.0,
            duration: elapsed,
            user_input: std::mem::take(&mut self.text),
            hot_keys,
            status: None,
            app: None,
            info: None,
        }
    }
}

impl Default for ActivityBatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Flush `batcher` every `interval` and publish each Observation on the
/// `observation` tag.
///
/// The sleep is not corrected for drift. Publishing never waits on a
/// running cycle: an Observation that lands while the proposal gate is held
/// is dropped by the gate and the next flush stays on schedule.
pub fn spawn_batcher(
    batcher: Arc<Mutex<ActivityBatcher>>,
    bus: Arc<TagBus>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    info!(interval_secs = interval.as_secs(), "Activity batcher started");

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let observation = match batcher.lock() {
                Ok(mut b) => b.flush(),
                Err(_) => {
                    warn!("Activity buffer poisoned, stopping batcher");
                    break;
                }
            };

            let content = match serde_json::to_string(&observation) {
                Ok(c) => c,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize observation, skipping");
                    continue;
                }
            };

            debug!(
                user_input_len = observation.user_input.len(),
                hot_keys = observation.hot_keys.len(),
                duration = observation.duration,
                "Flushing observation"
            );

            bus.publish(Tag::Observation, SOURCE, content);
        }
    })
}
