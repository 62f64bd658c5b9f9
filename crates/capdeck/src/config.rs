//! CLI configuration: resolves `config.toml`, the saved records and the
//! `GlobalOpts` flag overrides into a ready [`Connection`].
//!
//! Precedence is flag > env > file > default for client preferences.
//! Connection settings given as flags are applied for this process only;
//! they are written back to `settings.toml` after the next accepted
//! session, like any other settings change.

use std::path::PathBuf;
use std::sync::Arc;

use capdeck_config::{ClientConfig, FileStore};
use capdeck_core::{Connection, CoreConfig, PartialSettings};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

/// Everything a command needs besides its own arguments.
pub struct Ctx {
    pub dir: PathBuf,
    pub store: Arc<FileStore>,
    pub core: CoreConfig,
    pub overrides: PartialSettings,
    pub output: OutputFormat,
    pub color: bool,
    pub quiet: bool,
}

impl Ctx {
    /// Build the context from flags and `config.toml`.
    pub fn resolve(global: &GlobalOpts) -> Result<Self, CliError> {
        let dir = match global.config_dir {
            Some(ref dir) => dir.clone(),
            None => capdeck_config::config_dir()?,
        };
        let mut client = ClientConfig::load(&dir)?;

        if let Some(timeout) = global.timeout {
            client.timeout = timeout;
        }
        if global.insecure {
            client.insecure = true;
        }
        if global.dev {
            client.dev = true;
        }
        if let Some(ref version) = global.require {
            client.required_version.clone_from(version);
        }

        let output = match global.output {
            Some(format) => format,
            None => parse_enum::<OutputFormat>("output", &client.output)?,
        };
        let color_mode = match global.color {
            Some(mode) => mode,
            None => parse_enum::<ColorMode>("color", &client.color)?,
        };

        Ok(Self {
            store: Arc::new(FileStore::new(dir.clone())),
            dir,
            core: client.core_config(),
            overrides: overrides(global),
            output,
            color: output::should_color(color_mode),
            quiet: global.quiet,
        })
    }

    /// Open a connection backed by the config directory, with flag
    /// overrides applied on top of the saved settings.
    pub fn connect(&self) -> Result<Connection, CliError> {
        let conn = Connection::new(self.core.clone(), self.store.clone())?;
        if !self.overrides.is_empty() {
            conn.apply_settings(&self.overrides);
        }
        Ok(conn)
    }
}

fn overrides(global: &GlobalOpts) -> PartialSettings {
    PartialSettings {
        schema: global.schema.clone(),
        host: global.host.clone(),
        port: global.port,
        path: global.path.clone(),
        interval: global.interval,
        events: global.events,
    }
}

fn parse_enum<T: clap::ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: field.into(),
        reason,
    })
}
