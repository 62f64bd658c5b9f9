// ── Connection settings ──
//
// Where the agent lives and how often to ask it for news. The base URL
// is always derived from the parts; nothing stores it pre-composed.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_SCHEMA: &str = "http:";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8081;
pub const DEFAULT_PATH: &str = "/api";
pub const DEFAULT_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_EVENT_PAGE_SIZE: u32 = 25;

/// Endpoint and polling parameters.
///
/// Serializes to the persisted `settings` record shape:
/// `{schema, host, port, path, interval, events}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// URL scheme including the trailing colon, e.g. `http:`.
    pub schema: String,
    pub host: String,
    pub port: u16,
    /// API root path, e.g. `/api`.
    pub path: String,
    /// Poll interval in milliseconds.
    #[serde(rename = "interval")]
    pub interval_ms: u64,
    /// How many events to request per poll.
    #[serde(rename = "events")]
    pub event_page_size: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.into(),
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.into(),
            interval_ms: DEFAULT_INTERVAL_MS,
            event_page_size: DEFAULT_EVENT_PAGE_SIZE,
        }
    }
}

impl ConnectionSettings {
    /// `schema + "//" + host + ":" + port + path`
    pub fn url(&self) -> String {
        format!("{}//{}:{}{}", self.schema, self.host, self.port, self.path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Apply every field present in `partial`, keep the rest.
    ///
    /// Empty strings and zero numbers count as absent, so a half-written
    /// record can never blank out a working value.
    pub fn merge_from(&mut self, partial: &PartialSettings) {
        merge_str(&mut self.schema, partial.schema.as_deref());
        merge_str(&mut self.host, partial.host.as_deref());
        merge_str(&mut self.path, partial.path.as_deref());
        if let Some(port) = partial.port.filter(|p| *p != 0) {
            self.port = port;
        }
        if let Some(interval) = partial.interval.filter(|i| *i != 0) {
            self.interval_ms = interval;
        }
        if let Some(events) = partial.events.filter(|e| *e != 0) {
            self.event_page_size = events;
        }
    }
}

fn merge_str(field: &mut String, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        v.clone_into(field);
    }
}

/// A settings record where every field is optional.
///
/// Used to restore persisted settings and to apply user overrides
/// without needing a fully populated record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<u32>,
}

impl PartialSettings {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<&ConnectionSettings> for PartialSettings {
    fn from(s: &ConnectionSettings) -> Self {
        Self {
            schema: Some(s.schema.clone()),
            host: Some(s.host.clone()),
            port: Some(s.port),
            path: Some(s.path.clone()),
            interval: Some(s.interval_ms),
            events: Some(s.event_page_size),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_url_is_local_agent() {
        assert_eq!(ConnectionSettings::default().url(), "http://127.0.0.1:8081/api");
    }

    #[test]
    fn url_follows_field_changes() {
        let mut s = ConnectionSettings::default();
        s.schema = "https:".into();
        s.host = "agent.lan".into();
        s.port = 443;
        s.path = "/v1".into();
        assert_eq!(s.url(), "https://agent.lan:443/v1");
    }

    #[test]
    fn merging_empty_partial_changes_nothing() {
        let mut s = ConnectionSettings {
            host: "10.0.0.5".into(),
            interval_ms: 250,
            ..ConnectionSettings::default()
        };
        let before = s.clone();
        s.merge_from(&PartialSettings::default());
        assert_eq!(s, before);
    }

    #[test]
    fn merge_applies_only_present_fields() {
        let mut s = ConnectionSettings::default();
        s.merge_from(&PartialSettings {
            host: Some("192.168.1.10".into()),
            events: Some(100),
            ..PartialSettings::default()
        });
        assert_eq!(s.host, "192.168.1.10");
        assert_eq!(s.event_page_size, 100);
        assert_eq!(s.port, DEFAULT_PORT);
        assert_eq!(s.schema, DEFAULT_SCHEMA);
    }

    #[test]
    fn merge_ignores_empty_and_zero_values() {
        let mut s = ConnectionSettings::default();
        s.merge_from(&PartialSettings {
            schema: Some(String::new()),
            host: Some(String::new()),
            port: Some(0),
            interval: Some(0),
            events: Some(0),
            path: None,
        });
        assert_eq!(s, ConnectionSettings::default());
    }

    #[test]
    fn record_uses_persisted_field_names() {
        let value = serde_json::to_value(ConnectionSettings::default()).unwrap();
        assert_eq!(value["interval"], 1000);
        assert_eq!(value["events"], 25);
        assert_eq!(value["schema"], "http:");
    }

    #[test]
    fn partial_decodes_sparse_record() {
        let partial: PartialSettings =
            serde_json::from_str(r#"{"host":"10.1.1.1"}"#).unwrap();
        assert_eq!(partial.host.as_deref(), Some("10.1.1.1"));
        assert!(partial.port.is_none());
        assert!(!partial.is_empty());
        assert!(PartialSettings::default().is_empty());
    }
}
