// ── Domain model ──
//
// Wire types come straight from capdeck-api; the core adds only the
// derived authentication state.

use strum::{Display, EnumString};

pub use capdeck_api::{Caplet, CommandResponse, Environment, Event, Module, Session};

/// Where the client stands with the agent.
///
/// Never stored: derived from the credential store (presence and
/// validity) and whether a session has been cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum AuthState {
    /// No credentials.
    LoggedOut,
    /// Credentials set but not yet proven by a session fetch.
    PendingFirstFetch,
    /// Credentials accepted and a session is available.
    LoggedIn,
}

impl AuthState {
    pub fn derive(has_credentials: bool, valid: bool, has_session: bool) -> Self {
        match (has_credentials, valid && has_session) {
            (false, _) => Self::LoggedOut,
            (true, false) => Self::PendingFirstFetch,
            (true, true) => Self::LoggedIn,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_from_validity_and_cache() {
        assert_eq!(AuthState::derive(false, false, false), AuthState::LoggedOut);
        assert_eq!(AuthState::derive(false, false, true), AuthState::LoggedOut);
        assert_eq!(AuthState::derive(true, false, false), AuthState::PendingFirstFetch);
        assert_eq!(AuthState::derive(true, false, true), AuthState::PendingFirstFetch);
        assert_eq!(AuthState::derive(true, true, true), AuthState::LoggedIn);
    }

    #[test]
    fn displays_kebab_case() {
        assert_eq!(AuthState::PendingFirstFetch.to_string(), "pending-first-fetch");
    }
}
