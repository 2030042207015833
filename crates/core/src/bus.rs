//! Tag bus — the in-process message-passing substrate.
//!
//! Every tag owns three things:
//! - an exclusive async lock, used to serialize work scoped to that tag
//! - a mailbox holding the latest value published on it
//! - a broadcast channel that wakes subscribers on every publish
//!
//! Components never call each other directly across the observe → propose →
//! execute boundary; they publish on a tag and whoever subscribed reacts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, OwnedMutexGuard};

/// The named channels of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tag {
    /// A freshly flushed observation
    #[serde(rename = "observation")]
    Observation,
    /// Shared activity/context state (lock only)
    #[serde(rename = "activity")]
    Activity,
    /// The latest proposal from the backend
    #[serde(rename = "agent.propose")]
    Propose,
    /// The operation chosen for execution, or `nop`
    #[serde(rename = "agent.execute")]
    Execute,
    /// The catalogue of available operations
    #[serde(rename = "agent.operations")]
    Operations,
}

impl Tag {
    pub const ALL: [Tag; 5] = [
        Tag::Observation,
        Tag::Activity,
        Tag::Propose,
        Tag::Execute,
        Tag::Operations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Observation => "observation",
            Tag::Activity => "activity",
            Tag::Propose => "agent.propose",
            Tag::Execute => "agent.execute",
            Tag::Operations => "agent.operations",
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value published on a tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Published {
    pub tag: Tag,
    /// Name of the publishing component
    pub source: String,
    pub time: DateTime<Utc>,
    pub content: String,
}

struct Slot {
    lock: Arc<Mutex<()>>,
    mailbox: watch::Sender<Option<Arc<Published>>>,
    sender: broadcast::Sender<Arc<Published>>,
}

impl Slot {
    fn new(capacity: usize) -> Self {
        let (mailbox, _) = watch::channel(None);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            lock: Arc::new(Mutex::new(())),
            mailbox,
            sender,
        }
    }
}

/// Tag-addressed pub/sub with per-tag exclusive locks.
pub struct TagBus {
    slots: HashMap<Tag, Slot>,
}

impl TagBus {
    /// Create a new bus; `capacity` bounds each tag's broadcast backlog.
    pub fn new(capacity: usize) -> Self {
        let slots = Tag::ALL
            .into_iter()
            .map(|tag| (tag, Slot::new(capacity)))
            .collect();
        Self { slots }
    }

    fn slot(&self, tag: Tag) -> &Slot {
        // Every tag is created in `new`.
        &self.slots[&tag]
    }

    /// Store `content` as the latest value of `tag` and wake subscribers.
    pub fn publish(&self, tag: Tag, source: &str, content: impl Into<String>) -> Arc<Published> {
        let published = Arc::new(Published {
            tag,
            source: source.to_string(),
            time: Utc::now(),
            content: content.into(),
        });
        let slot = self.slot(tag);
        slot.mailbox.send_replace(Some(published.clone()));
        // No subscribers is fine
        let _ = slot.sender.send(published.clone());
        tracing::trace!(tag = %tag, source, "Published");
        published
    }

    /// Store a value without waking subscribers.
    pub fn publish_silent(&self, tag: Tag, source: &str, content: impl Into<String>) {
        let published = Arc::new(Published {
            tag,
            source: source.to_string(),
            time: Utc::now(),
            content: content.into(),
        });
        self.slot(tag).mailbox.send_replace(Some(published));
    }

    /// The latest value published on `tag`, if any.
    pub fn latest(&self, tag: Tag) -> Option<Arc<Published>> {
        self.slot(tag).mailbox.borrow().clone()
    }

    /// Receive every subsequent publish on `tag`.
    pub fn subscribe(&self, tag: Tag) -> broadcast::Receiver<Arc<Published>> {
        self.slot(tag).sender.subscribe()
    }

    /// Wait for the exclusive lock of `tag`.
    pub async fn lock(&self, tag: Tag) -> OwnedMutexGuard<()> {
        self.slot(tag).lock.clone().lock_owned().await
    }

    /// Take the exclusive lock of `tag` only if nobody holds it.
    pub fn try_lock(&self, tag: Tag) -> Option<OwnedMutexGuard<()>> {
        self.slot(tag).lock.clone().try_lock_owned().ok()
    }

    pub fn is_locked(&self, tag: Tag) -> bool {
        self.slot(tag).lock.try_lock().is_err()
    }
}

impl Default for TagBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_wakes_subscribers() {
        let bus = TagBus::new(16);
        let mut rx = bus.subscribe(Tag::Observation);

        bus.publish(Tag::Observation, "test", "{\"user_input\":\"hi\"}");

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.tag, Tag::Observation);
        assert_eq!(msg.source, "test");
        assert!(msg.content.contains("hi"));
    }

    #[test]
    fn latest_value_is_kept_per_tag() {
        let bus = TagBus::default();
        assert!(bus.latest(Tag::Propose).is_none());

        bus.publish(Tag::Propose, "agent", "first");
        bus.publish(Tag::Propose, "agent", "second");
        bus.publish(Tag::Execute, "agent", "nop");

        assert_eq!(bus.latest(Tag::Propose).unwrap().content, "second");
        assert_eq!(bus.latest(Tag::Execute).unwrap().content, "nop");
    }

    #[tokio::test]
    async fn silent_publish_does_not_wake() {
        let bus = TagBus::default();
        let mut rx = bus.subscribe(Tag::Operations);
        bus.publish_silent(Tag::Operations, "env", "[]");
        assert_eq!(bus.latest(Tag::Operations).unwrap().content, "[]");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn no_subscribers_doesnt_panic() {
        let bus = TagBus::new(4);
        bus.publish(Tag::Execute, "agent", "nop");
    }

    #[tokio::test]
    async fn tag_locks_are_exclusive_and_independent() {
        let bus = TagBus::default();
        let guard = bus.lock(Tag::Propose).await;
        assert!(bus.is_locked(Tag::Propose));
        assert!(bus.try_lock(Tag::Propose).is_none());
        assert!(!bus.is_locked(Tag::Activity));

        drop(guard);
        assert!(!bus.is_locked(Tag::Propose));
        assert!(bus.try_lock(Tag::Propose).is_some());
    }

    #[test]
    fn tag_names() {
        assert_eq!(Tag::Propose.to_string(), "agent.propose");
        assert_eq!(
            serde_json::to_string(&Tag::Operations).unwrap(),
            "\"agent.operations\""
        );
    }
}
