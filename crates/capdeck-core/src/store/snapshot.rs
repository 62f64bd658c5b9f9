use std::sync::Arc;

use arc_swap::ArcSwap;

use capdeck_api::{Event, Session};

/// The client's cached view of the agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    /// Last accepted session; `None` until the first one arrives.
    pub session: Option<Arc<Session>>,
    /// Last fetched page of events, oldest first.
    pub events: Arc<Vec<Event>>,
    /// Round-trip time of the last successful session fetch.
    pub ping_ms: u64,
}

/// A partial snapshot write. Only `Some` fields are applied.
#[derive(Debug, Clone, Default)]
pub struct SnapshotUpdate {
    pub session: Option<Arc<Session>>,
    pub events: Option<Arc<Vec<Event>>>,
    pub ping_ms: Option<u64>,
}

impl SnapshotUpdate {
    pub fn session(session: Arc<Session>, ping_ms: u64) -> Self {
        Self {
            session: Some(session),
            ping_ms: Some(ping_ms),
            ..Self::default()
        }
    }

    pub fn events(events: Arc<Vec<Event>>) -> Self {
        Self {
            events: Some(events),
            ..Self::default()
        }
    }
}

/// Holder of the current [`Snapshot`].
///
/// Reads never block. Writes replace only the fields they carry, so the
/// session and event pipelines can update concurrently without
/// overwriting each other.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    current: ArcSwap<Snapshot>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent snapshot (cheap `Arc` clone).
    pub fn get(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn update(&self, update: &SnapshotUpdate) {
        self.current.rcu(|current| {
            let mut next = Snapshot::clone(current);
            if let Some(session) = &update.session {
                next.session = Some(Arc::clone(session));
            }
            if let Some(events) = &update.events {
                next.events = Arc::clone(events);
            }
            if let Some(ping_ms) = update.ping_ms {
                next.ping_ms = ping_ms;
            }
            next
        });
    }

    pub fn session(&self) -> Option<Arc<Session>> {
        self.current.load().session.clone()
    }

    pub fn events(&self) -> Arc<Vec<Event>> {
        Arc::clone(&self.current.load().events)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn session(version: &str) -> Arc<Session> {
        Arc::new(serde_json::from_value(json!({ "version": version })).unwrap())
    }

    fn event(tag: &str) -> Event {
        serde_json::from_value(json!({ "tag": tag, "time": "2024-01-01T00:00:00Z" })).unwrap()
    }

    #[test]
    fn starts_empty() {
        let cache = SnapshotCache::new();
        let snap = cache.get();
        assert!(snap.session.is_none());
        assert!(snap.events.is_empty());
        assert_eq!(snap.ping_ms, 0);
    }

    #[test]
    fn session_update_leaves_events_alone() {
        let cache = SnapshotCache::new();
        cache.update(&SnapshotUpdate::events(Arc::new(vec![event("sys.log")])));
        cache.update(&SnapshotUpdate::session(session("2.32.0"), 12));

        let snap = cache.get();
        assert_eq!(snap.session.as_ref().unwrap().version, "2.32.0");
        assert_eq!(snap.ping_ms, 12);
        assert_eq!(snap.events.len(), 1);
    }

    #[test]
    fn events_update_leaves_session_alone() {
        let cache = SnapshotCache::new();
        cache.update(&SnapshotUpdate::session(session("2.32.0"), 7));
        cache.update(&SnapshotUpdate::events(Arc::new(Vec::new())));

        let snap = cache.get();
        assert_eq!(snap.session.as_ref().unwrap().version, "2.32.0");
        assert_eq!(snap.ping_ms, 7);
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let cache = SnapshotCache::new();
        cache.update(&SnapshotUpdate::session(session("1.0.0"), 3));
        let before = cache.get();
        cache.update(&SnapshotUpdate::default());
        assert_eq!(*cache.get(), *before);
    }

    #[test]
    fn readers_keep_their_snapshot() {
        let cache = SnapshotCache::new();
        cache.update(&SnapshotUpdate::session(session("1.0.0"), 3));
        let held = cache.get();
        cache.update(&SnapshotUpdate::session(session("2.0.0"), 4));
        assert_eq!(held.session.as_ref().unwrap().version, "1.0.0");
        assert_eq!(cache.session().unwrap().version, "2.0.0");
    }
}
