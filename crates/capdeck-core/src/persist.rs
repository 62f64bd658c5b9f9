// ── Local persistence seam ──
//
// Two independent records survive restarts: connection settings and
// the login. Backends are synchronous and best-effort; the core logs
// their failures and carries on with in-memory state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CoreError;
use crate::settings::{ConnectionSettings, PartialSettings};

/// The persisted `auth` record: `{username, password}`.
///
/// Stored in plaintext by the file backend to stay compatible with the
/// record shape existing installs already have on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAuth {
    pub username: String,
    #[serde(serialize_with = "expose_password")]
    pub password: SecretString,
}

fn expose_password<S: Serializer>(password: &SecretString, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(password.expose_secret())
}

/// Storage backend for the settings and auth records.
///
/// `load_*` returns `Ok(None)` when the record does not exist.
pub trait Persistence: Send + Sync {
    fn load_settings(&self) -> Result<Option<PartialSettings>, CoreError>;
    fn save_settings(&self, settings: &ConnectionSettings) -> Result<(), CoreError>;
    fn clear_settings(&self) -> Result<(), CoreError>;

    fn load_auth(&self) -> Result<Option<StoredAuth>, CoreError>;
    fn save_auth(&self, auth: &StoredAuth) -> Result<(), CoreError>;
    fn clear_auth(&self) -> Result<(), CoreError>;
}

/// In-process backend. Used for tests and for hosts that do not want
/// anything written to disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    settings: Mutex<Option<PartialSettings>>,
    auth: Mutex<Option<StoredAuth>>,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate both records.
    pub fn with_records(settings: Option<PartialSettings>, auth: Option<StoredAuth>) -> Self {
        Self {
            settings: Mutex::new(settings),
            auth: Mutex::new(auth),
            failing: AtomicBool::new(false),
        }
    }

    /// Make every subsequent operation fail, simulating an unavailable
    /// backend.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Persistence {
                message: "storage backend unavailable".into(),
            });
        }
        Ok(())
    }
}

impl Persistence for MemoryStore {
    fn load_settings(&self) -> Result<Option<PartialSettings>, CoreError> {
        self.check()?;
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save_settings(&self, settings: &ConnectionSettings) -> Result<(), CoreError> {
        self.check()?;
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = Some(settings.into());
        Ok(())
    }

    fn clear_settings(&self) -> Result<(), CoreError> {
        self.check()?;
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    fn load_auth(&self) -> Result<Option<StoredAuth>, CoreError> {
        self.check()?;
        Ok(self.auth.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save_auth(&self, auth: &StoredAuth) -> Result<(), CoreError> {
        self.check()?;
        *self.auth.lock().unwrap_or_else(PoisonError::into_inner) = Some(auth.clone());
        Ok(())
    }

    fn clear_auth(&self) -> Result<(), CoreError> {
        self.check()?;
        *self.auth.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
