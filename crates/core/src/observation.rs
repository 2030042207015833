//! Observation — one aggregated snapshot of user activity.

use serde::{Deserialize, Serialize};

/// A raw activity event as delivered by the capture layer.
///
/// Kept as an untyped JSON value: the capture mechanism is external and the
/// loop only ever inspects the `hot_key` field.
pub type RawEvent = serde_json::Value;

/// Whether the user was at the keyboard during the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityStatus {
    #[serde(rename = "afk")]
    Afk,
    #[serde(rename = "not-afk")]
    NotAfk,
}

/// One batch interval worth of user activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Start of the window, epoch seconds (UTC)
    pub timestamp: f64,

    /// Window length in seconds
    pub duration: f64,

    /// Text typed during the window
    #[serde(default)]
    pub user_input: String,

    /// Buffered events that carry a `hot_key` field, in arrival order
    #[serde(rename = "hot-keys", default)]
    pub hot_keys: Vec<RawEvent>,

    #[serde(default)]
    pub status: Option<ActivityStatus>,

    #[serde(default)]
    pub app: Option<String>,

    #[serde(default)]
    pub info: Option<serde_json::Value>,
}

impl Observation {
    /// True when nothing was typed and no hot key was pressed.
    pub fn is_quiet(&self) -> bool {
        self.user_input.is_empty() && self.hot_keys.is_empty()
    }
}

/// Whether a raw event carries a hot key, either at the top level or inside
/// its `data` payload.
pub fn has_hot_key(event: &RawEvent) -> bool {
    event.get("hot_key").is_some()
        || event
            .get("data")
            .and_then(|d| d.as_object())
            .is_some_and(|d| d.contains_key("hot_key"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_wire_field_names() {
        let obs = Observation {
            timestamp: 1.5,
            duration: 15.0,
            user_input: "hello".into(),
            hot_keys: vec![],
            status: Some(ActivityStatus::NotAfk),
            app: None,
            info: None,
        };
        let value = serde_json::to_value(&obs).unwrap();
        assert_eq!(value["user_input"], "hello");
        assert!(value["hot-keys"].is_array());
        assert_eq!(value["status"], "not-afk");
        assert!(value["app"].is_null());
    }

    #[test]
    fn parses_minimal_observation() {
        let obs: Observation =
            serde_json::from_value(json!({"timestamp": 0.0, "duration": 1.0})).unwrap();
        assert!(obs.is_quiet());
        assert!(obs.status.is_none());
    }

    #[test]
    fn hot_key_detection() {
        assert!(has_hot_key(&json!({"data": {"hot_key": "ctrl+c"}})));
        assert!(has_hot_key(&json!({"hot_key": "ctrl+v"})));
        assert!(!has_hot_key(&json!({"data": {"key": "a"}})));
        assert!(!has_hot_key(&json!("not an object")));
    }
}
