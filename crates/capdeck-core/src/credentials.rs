// ── Credential store ──
//
// Current username/password and the validity flag. The Authorization
// header is rebuilt from the stored fields on every read. Every `set` and
// `clear` bumps a generation so late responses can tell whether they
// still speak for the current credentials.

use capdeck_api::BasicCredentials;
use secrecy::SecretString;

#[derive(Debug, Default)]
pub struct CredentialStore {
    creds: Option<BasicCredentials>,
    valid: bool,
    generation: u64,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a username/password pair. Does not touch the validity flag:
    /// only a successful session fetch proves credentials good.
    pub fn set(&mut self, username: impl Into<String>, password: SecretString) {
        self.creds = Some(BasicCredentials::new(username, password));
        self.generation = self.generation.wrapping_add(1);
    }

    /// Forget everything, including validity. Idempotent.
    pub fn clear(&mut self) {
        self.creds = None;
        self.valid = false;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Mark the current credentials as accepted by the agent.
    ///
    /// Returns `true` only on the not-valid → valid edge.
    pub(crate) fn mark_valid(&mut self) -> bool {
        let was_valid = self.valid;
        self.valid = true;
        !was_valid
    }

    /// Counter bumped on every `set` and `clear`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn has_credentials(&self) -> bool {
        self.creds.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.creds.as_ref().map(|c| c.username.as_str())
    }

    pub fn credentials(&self) -> Option<&BasicCredentials> {
        self.creds.as_ref()
    }

    /// `Basic ...` header value for the current credentials.
    pub fn auth_header(&self) -> Option<SecretString> {
        self.creds.as_ref().map(BasicCredentials::header_value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn set_builds_header_but_not_validity() {
        let mut store = CredentialStore::new();
        store.set("user", secret("pass"));
        assert_eq!(store.username(), Some("user"));
        assert_eq!(
            store.auth_header().unwrap().expose_secret(),
            "Basic dXNlcjpwYXNz"
        );
        assert!(!store.is_valid());
    }

    #[test]
    fn header_tracks_latest_credentials() {
        let mut store = CredentialStore::new();
        store.set("a", secret("1"));
        store.set("user", secret("pass"));
        assert_eq!(
            store.auth_header().unwrap().expose_secret(),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn mark_valid_reports_edge_once() {
        let mut store = CredentialStore::new();
        store.set("user", secret("pass"));
        assert!(store.mark_valid());
        assert!(!store.mark_valid());
        assert!(store.is_valid());
    }

    #[test]
    fn generation_moves_on_set_and_clear() {
        let mut store = CredentialStore::new();
        let start = store.generation();
        store.set("user", secret("pass"));
        let after_set = store.generation();
        assert_ne!(after_set, start);

        store.mark_valid();
        assert_eq!(store.generation(), after_set, "validity is not a new generation");

        store.clear();
        assert_ne!(store.generation(), after_set);
    }

    #[test]
    fn clear_resets_everything_and_is_idempotent() {
        let mut store = CredentialStore::new();
        store.set("user", secret("pass"));
        store.mark_valid();

        store.clear();
        assert!(!store.is_valid());
        assert!(!store.has_credentials());
        assert!(store.auth_header().is_none());
        assert!(store.username().is_none());

        store.clear();
        assert!(!store.is_valid());
        assert!(store.mark_valid(), "edge fires again after a clear");
    }
}
