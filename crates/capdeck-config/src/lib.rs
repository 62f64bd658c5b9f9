//! On-disk configuration for capdeck.
//!
//! Two concerns live here:
//!
//! - [`FileStore`]: the [`Persistence`] backend that keeps the `settings`
//!   and `auth` records as TOML files in the platform config directory.
//!   Settings can be overridden with `CAPDECK_SETTINGS_*` variables.
//! - [`ClientConfig`]: host preferences (`config.toml`) that shape how the
//!   core is built: timeout, TLS, required agent version, output format.
//!
//! The `auth` record is plaintext (`0600` on Unix) so existing installs
//! keep working. Anyone with read access to the config directory can
//! read the agent password.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use capdeck_core::{
    ConnectionSettings, CoreConfig, CoreError, DEFAULT_REQUIRED_VERSION, PartialSettings,
    Persistence, StoredAuth, TlsMode, TransportConfig,
};

const SETTINGS_FILE: &str = "settings.toml";
const AUTH_FILE: &str = "auth.toml";
const CONFIG_FILE: &str = "config.toml";
const SETTINGS_ENV_PREFIX: &str = "CAPDECK_SETTINGS_";
const CONFIG_ENV_PREFIX: &str = "CAPDECK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine a config directory for this platform")]
    NoConfigDir,

    #[error("failed to serialize {what}: {source}")]
    Serialization {
        what: &'static str,
        source: toml::ser::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<ConfigError> for CoreError {
    fn from(err: ConfigError) -> Self {
        CoreError::Persistence {
            message: err.to_string(),
        }
    }
}

// ── Config directory ────────────────────────────────────────────────

/// Resolve the config directory via XDG / platform conventions.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    ProjectDirs::from("com", "capdeck", "capdeck")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or(ConfigError::NoConfigDir)
}

// ── FileStore ───────────────────────────────────────────────────────

/// [`Persistence`] backed by `settings.toml` and `auth.toml`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the platform config directory.
    pub fn default_location() -> Result<Self, ConfigError> {
        config_dir().map(Self::new)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn settings_path(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE)
    }

    pub fn auth_path(&self) -> PathBuf {
        self.dir.join(AUTH_FILE)
    }

    /// Settings file merged with `CAPDECK_SETTINGS_*` overrides.
    fn read_settings(&self) -> Result<Option<PartialSettings>, ConfigError> {
        let partial: PartialSettings = Figment::new()
            .merge(Toml::file(self.settings_path()))
            .merge(Env::prefixed(SETTINGS_ENV_PREFIX))
            .extract()?;
        Ok(Some(partial).filter(|p| !p.is_empty()))
    }

    fn read_auth(&self) -> Result<Option<StoredAuth>, ConfigError> {
        let path = self.auth_path();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse { path, source })
    }

    fn write(&self, path: &Path, contents: &str, private: bool) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(|source| ConfigError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        if private {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path).map_err(io_err)?;

        // `mode` only applies on creation; narrow an older file before
        // anything is written to it.
        #[cfg(unix)]
        if private {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(io_err)?;
        }

        file.write_all(contents.as_bytes()).map_err(io_err)?;
        debug!(path = %path.display(), private, "wrote record");
        Ok(())
    }

    fn remove(path: &Path) -> Result<(), ConfigError> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl Persistence for FileStore {
    fn load_settings(&self) -> Result<Option<PartialSettings>, CoreError> {
        Ok(self.read_settings()?)
    }

    fn save_settings(&self, settings: &ConnectionSettings) -> Result<(), CoreError> {
        let contents = toml::to_string_pretty(settings).map_err(|source| {
            ConfigError::Serialization {
                what: "settings",
                source,
            }
        })?;
        Ok(self.write(&self.settings_path(), &contents, false)?)
    }

    fn clear_settings(&self) -> Result<(), CoreError> {
        Ok(Self::remove(&self.settings_path())?)
    }

    fn load_auth(&self) -> Result<Option<StoredAuth>, CoreError> {
        Ok(self.read_auth()?)
    }

    fn save_auth(&self, auth: &StoredAuth) -> Result<(), CoreError> {
        let path = self.auth_path();
        let contents = toml::to_string_pretty(auth).map_err(|source| {
            ConfigError::Serialization {
                what: "credentials",
                source,
            }
        })?;
        self.write(&path, &contents, true)?;
        Ok(())
    }

    fn clear_auth(&self) -> Result<(), CoreError> {
        Ok(Self::remove(&self.auth_path())?)
    }
}

// ── Client preferences ──────────────────────────────────────────────

/// Host preferences from `config.toml` and `CAPDECK_*` variables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Default output format: `table`, `json`, `json-compact`, `yaml`, `plain`.
    pub output: String,
    /// `auto`, `always` or `never`.
    pub color: String,
    /// HTTP timeout in seconds.
    pub timeout: u64,
    /// Accept invalid TLS certificates.
    pub insecure: bool,
    /// Extra CA certificate for agents behind a private CA.
    pub ca_cert: Option<PathBuf>,
    /// Oldest agent API version accepted.
    pub required_version: String,
    /// Only warn about outdated agents instead of logging out.
    pub dev: bool,
    /// Event poll interval override in milliseconds.
    pub event_interval: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            output: "table".into(),
            color: "auto".into(),
            timeout: 10,
            insecure: false,
            ca_cert: None,
            required_version: DEFAULT_REQUIRED_VERSION.into(),
            dev: false,
            event_interval: None,
        }
    }
}

impl ClientConfig {
    /// Load from `dir/config.toml` plus environment. A missing file
    /// yields the defaults.
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(dir.join(CONFIG_FILE)))
            .merge(Env::prefixed(CONFIG_ENV_PREFIX))
            .extract()?;
        Ok(config)
    }

    pub fn transport(&self) -> TransportConfig {
        let tls = if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ref ca) = self.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        };
        TransportConfig {
            tls,
            timeout: Duration::from_secs(self.timeout),
        }
    }

    /// Translate into the core's runtime configuration.
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            required_version: self.required_version.clone(),
            production: !self.dev,
            event_interval: self.event_interval.map(Duration::from_millis),
            transport: self.transport(),
        }
    }
}
