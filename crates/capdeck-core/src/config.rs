// ── Runtime configuration ──
//
// How the core behaves, as opposed to where the agent is (that lives in
// `ConnectionSettings` and is persisted). The host process builds a
// `CoreConfig` and hands it in; the core never reads config files.

use std::time::Duration;

use capdeck_api::TransportConfig;

/// Oldest agent API version this client knows how to render.
pub const DEFAULT_REQUIRED_VERSION: &str = "2.23.0";

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Minimum agent API version accepted by the compatibility gate.
    pub required_version: String,
    /// Production builds reject too-old agents; non-production builds
    /// only warn. Always set explicitly by the host.
    pub production: bool,
    /// Event poll cadence. `None` follows the settings poll interval.
    pub event_interval: Option<Duration>,
    /// HTTP timeout and TLS handling.
    pub transport: TransportConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            required_version: DEFAULT_REQUIRED_VERSION.into(),
            production: true,
            event_interval: None,
            transport: TransportConfig::default(),
        }
    }
}
