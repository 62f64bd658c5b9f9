// ── Last-known-good state ──
//
// Lock-free snapshot storage shared by both pollers and every reader.

mod snapshot;

pub use snapshot::{Snapshot, SnapshotCache, SnapshotUpdate};
