//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use capdeck_config::ConfigError;
use capdeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const INCOMPATIBLE: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to agent at {url}")]
    #[diagnostic(
        code(capdeck::connection_failed),
        help(
            "Check that the agent's REST API is running and reachable.\n\
             Reason: {reason}\n\
             Try: capdeck settings show"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(capdeck::timeout),
        help("Increase the timeout with --timeout or check the agent's responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(capdeck::auth_failed),
        help("Saved credentials were cleared. Log in again with: capdeck login <username>")
    )]
    AuthFailed { message: String },

    #[error("Not logged in")]
    #[diagnostic(
        code(capdeck::not_logged_in),
        help("Log in with: capdeck login <username>")
    )]
    NotLoggedIn,

    #[error("{message}")]
    #[diagnostic(
        code(capdeck::incompatible_version),
        help(
            "Upgrade the agent, or pass --dev to continue against an older API\n\
             (some views may not render correctly)."
        )
    )]
    IncompatibleVersion { message: String },

    // ── Agent ────────────────────────────────────────────────────────
    #[error("Agent error: {message}")]
    #[diagnostic(code(capdeck::api_error))]
    Api { status: Option<u16>, message: String },

    #[error("Command failed: {message}")]
    #[diagnostic(code(capdeck::command_failed))]
    CommandFailed { message: String },

    #[error("'{name}' not found in the agent session")]
    #[diagnostic(
        code(capdeck::not_found),
        help("Run: capdeck session {list_command} to see what is available")
    )]
    NotFound {
        name: String,
        list_command: &'static str,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(capdeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(capdeck::config))]
    Config(#[from] ConfigError),

    #[error("{message}")]
    #[diagnostic(code(capdeck::storage))]
    Storage { message: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render output: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NotLoggedIn => exit_code::AUTH,
            Self::IncompatibleVersion { .. } => exit_code::INCOMPATIBLE,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::Timeout => CliError::Timeout,
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::NotLoggedIn => CliError::NotLoggedIn,
            err @ CoreError::IncompatibleVersion { .. } => CliError::IncompatibleVersion {
                message: err.to_string(),
            },
            CoreError::Api { message, status } => CliError::Api { status, message },
            CoreError::Persistence { message } | CoreError::Config { message } => {
                CliError::Storage { message }
            }
            err @ (CoreError::Cancelled | CoreError::Internal(_)) => CliError::Api {
                status: None,
                message: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(
            CliError::from(CoreError::AuthenticationFailed {
                message: "bad".into()
            })
            .exit_code(),
            exit_code::AUTH
        );
        assert_eq!(CliError::from(CoreError::Timeout).exit_code(), exit_code::TIMEOUT);
        assert_eq!(
            CliError::from(CoreError::IncompatibleVersion {
                required: "3.0.0".into(),
                found: "2.9.9".into(),
                url: "http://127.0.0.1:8081/api".into(),
            })
            .exit_code(),
            exit_code::INCOMPATIBLE
        );
        assert_eq!(
            CliError::from(CoreError::Api {
                message: "nope".into(),
                status: Some(400)
            })
            .exit_code(),
            exit_code::GENERAL
        );
    }

    #[test]
    fn incompatible_message_survives() {
        let err = CliError::from(CoreError::IncompatibleVersion {
            required: "3.0.0".into(),
            found: "2.9.9".into(),
            url: "http://127.0.0.1:8081/api".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("3.0.0") && msg.contains("2.9.9"), "{msg}");
    }
}
