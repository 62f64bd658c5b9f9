use thiserror::Error;

/// Top-level error type for the `capdeck-api` crate.
///
/// Covers every failure mode of a single request against the agent:
/// credential rejection, non-success statuses, transport, and decoding.
/// `capdeck-core` maps these into its own domain errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The agent rejected the credentials (HTTP 401).
    #[error("Authentication failed: {message}")]
    Unauthorized { message: String },

    // ── HTTP ────────────────────────────────────────────────────────
    /// Any other non-success status. `message` is the agent's
    /// `{"error": "..."}` body when present, else a body preview.
    #[error("Agent returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns `true` if the agent rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Returns `true` if this is a connectivity problem rather than an
    /// answer from the agent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Self::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_reports_401() {
        let err = Error::Unauthorized {
            message: "nope".into(),
        };
        assert_eq!(err.status(), Some(401));
        assert!(err.is_unauthorized());
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = Error::Status {
            status: 502,
            message: "bad gateway".into(),
        };
        assert!(err.is_transient());
        assert!(!err.is_unauthorized());

        let err = Error::Status {
            status: 400,
            message: "unknown command".into(),
        };
        assert!(!err.is_transient());
    }
}
