//! Synchronization core between `capdeck-api` and UI consumers.
//!
//! This crate keeps a client in step with a remote agent:
//!
//! - **[`Connection`]**: central facade. Holds credentials and connection
//!   settings, runs the session and event pollers, applies the
//!   [`CompatibilityGate`] to every fetched session and exposes commands
//!   and remote file access.
//!
//! - **[`SnapshotCache`]**: lock-free last-known-good [`Snapshot`]
//!   (session, events, ping). A failed fetch never touches it, so
//!   consumers degrade to stale data instead of errors.
//!
//! - **[`NotificationBus`]**: typed broadcast channels (new session, new
//!   events, logged in, logged out, session error, command error).
//!
//! - **[`Persistence`]**: storage seam for the two records that survive
//!   restarts (`settings` and `auth`). [`MemoryStore`] ships here; the
//!   file-backed store lives in `capdeck-config`.

pub mod bus;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod gate;
pub mod model;
pub mod persist;
pub mod settings;
pub mod store;
pub mod version;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bus::{NotificationBus, NotificationStream, Subscription};
pub use config::{CoreConfig, DEFAULT_REQUIRED_VERSION};
pub use connection::Connection;
pub use credentials::CredentialStore;
pub use error::{CoreError, INCOMPATIBLE_VERSION_STATUS};
pub use gate::{CompatibilityGate, GateDecision};
pub use model::{AuthState, Caplet, CommandResponse, Environment, Event, Module, Session};
pub use persist::{MemoryStore, Persistence, StoredAuth};
pub use settings::{ConnectionSettings, PartialSettings};
pub use store::{Snapshot, SnapshotCache, SnapshotUpdate};
pub use version::{Version, compare_versions};

// Transport knobs consumers need to build a `CoreConfig`.
pub use capdeck_api::{TlsMode, TransportConfig};
