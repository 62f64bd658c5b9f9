// ── Core error types ──
//
// User-facing errors from capdeck-core. Consumers never see reqwest or
// serde errors directly; the `From<capdeck_api::Error>` impl translates
// transport-layer failures into domain variants.
//
// `CoreError` is `Clone` because the same error value is fanned out to
// every notification subscriber.

use thiserror::Error;

/// Status code carried by the synthetic version-mismatch error, so
/// consumers that switch on status can tell it apart from real HTTP codes.
pub const INCOMPATIBLE_VERSION_STATUS: u16 = 666;

/// Unified error type for the core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to agent at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Agent request timed out")]
    Timeout,

    #[error(
        "This client requires at least API v{required} but {url} is at v{found}"
    )]
    IncompatibleVersion {
        required: String,
        found: String,
        url: String,
    },

    #[error("Not logged in")]
    NotLoggedIn,

    /// The request was still in flight when its poller was stopped or
    /// the user logged out; its result was discarded.
    #[error("Request discarded after logout or stop")]
    Cancelled,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Local state errors ───────────────────────────────────────────
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP status (or the synthetic version-mismatch status) behind this
    /// error. Command callers use it to tell auth problems from others.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthenticationFailed { .. } => Some(401),
            Self::IncompatibleVersion { .. } => Some(INCOMPATIBLE_VERSION_STATUS),
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// `true` when the agent rejected the credentials.
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::AuthenticationFailed { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<capdeck_api::Error> for CoreError {
    fn from(err: capdeck_api::Error) -> Self {
        match err {
            capdeck_api::Error::Unauthorized { message } => {
                CoreError::AuthenticationFailed { message }
            }
            capdeck_api::Error::Status { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            capdeck_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            capdeck_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            capdeck_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            capdeck_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_maps_to_auth_failure() {
        let err = CoreError::from(capdeck_api::Error::Unauthorized {
            message: "bad creds".into(),
        });
        assert!(err.is_auth_rejection());
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn status_errors_keep_their_code() {
        let err = CoreError::from(capdeck_api::Error::Status {
            status: 400,
            message: "unknown command".into(),
        });
        assert_eq!(err.status(), Some(400));
        assert!(!err.is_auth_rejection());
        assert_eq!(err.to_string(), "API error: unknown command");
    }

    #[test]
    fn version_mismatch_names_both_versions_and_url() {
        let err = CoreError::IncompatibleVersion {
            required: "3.0.0".into(),
            found: "2.9.9".into(),
            url: "http://127.0.0.1:8081/api".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("3.0.0"));
        assert!(msg.contains("2.9.9"));
        assert!(msg.contains("http://127.0.0.1:8081/api"));
        assert_eq!(err.status(), Some(INCOMPATIBLE_VERSION_STATUS));
    }
}
