//! Clap derive structures for the `capdeck` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// capdeck -- drive a remote agent's REST API from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "capdeck",
    version,
    about = "Control a remote agent from the command line",
    long_about = "Log in to a remote agent's REST API, inspect its session and event log,\n\
        run commands, edit files on the agent and watch it live.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Agent host (overrides saved settings)
    #[arg(long, short = 'H', env = "CAPDECK_HOST", global = true)]
    pub host: Option<String>,

    /// Agent port
    #[arg(long, short = 'P', env = "CAPDECK_PORT", global = true)]
    pub port: Option<u16>,

    /// URL scheme, e.g. `http:` or `https:`
    #[arg(long, env = "CAPDECK_SCHEMA", global = true)]
    pub schema: Option<String>,

    /// API root path
    #[arg(long, env = "CAPDECK_PATH", global = true)]
    pub path: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Events requested per poll
    #[arg(long, global = true)]
    pub events: Option<u32>,

    /// Only warn about agents older than the required API version
    #[arg(long, global = true)]
    pub dev: bool,

    /// Minimum agent API version
    #[arg(long, value_name = "VERSION", global = true)]
    pub require: Option<String>,

    /// Output format
    #[arg(long, short = 'o', env = "CAPDECK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Directory holding config.toml, settings.toml and auth.toml
    #[arg(long, env = "CAPDECK_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in and save the credentials
    Login(LoginArgs),

    /// Forget saved credentials and settings
    Logout,

    /// Show connection and agent status
    Status,

    /// Inspect the agent session
    #[command(alias = "s")]
    Session(SessionArgs),

    /// List or clear the agent event log
    #[command(alias = "ev")]
    Events(EventsArgs),

    /// Poll the agent and print changes until interrupted
    Watch(WatchArgs),

    /// Run a command on the agent
    Run(RunArgs),

    /// Read or write files on the agent
    File(FileArgs),

    /// Show or change saved connection settings
    Settings(SettingsArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Login ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Agent username
    pub username: String,

    /// Agent password (prompted when omitted)
    #[arg(long, env = "CAPDECK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

// ── Session ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[command(subcommand)]
    pub command: SessionCommand,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Print the full session
    Show,

    /// List modules, or show one
    #[command(alias = "mod")]
    Modules {
        /// Module name
        name: Option<String>,
    },

    /// List environment variables, or print one
    Env {
        /// Variable name
        name: Option<String>,
    },

    /// List caplets, or print one's code
    Caplets {
        /// Caplet name
        name: Option<String>,
    },
}

// ── Events ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct EventsArgs {
    #[command(subcommand)]
    pub command: EventsCommand,
}

#[derive(Debug, Subcommand)]
pub enum EventsCommand {
    /// Fetch the most recent events
    List {
        /// How many events to request (defaults to the saved page size)
        #[arg(long, short = 'n')]
        limit: Option<u32>,

        /// Only events whose tag starts with this prefix
        #[arg(long, short = 't')]
        tag: Option<String>,
    },

    /// Clear the agent's event log
    Clear,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Do not print events
    #[arg(long)]
    pub no_events: bool,

    /// Print a line for every session update, not just the first
    #[arg(long)]
    pub every_session: bool,
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Command line to send, e.g. `net.recon on`
    #[arg(required = true, trailing_var_arg = true)]
    pub cmd: Vec<String>,

    /// Do not wait for the answer; only report a failure
    #[arg(long, short = 'd')]
    pub detach: bool,
}

// ── Files ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FileArgs {
    #[command(subcommand)]
    pub command: FileCommand,
}

#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// Print a file from the agent
    Get {
        /// Path on the agent
        name: String,
    },

    /// Upload a file to the agent
    Put {
        /// Path on the agent
        name: String,

        /// Local file to upload (stdin when omitted)
        #[arg(long, short = 'f')]
        from: Option<PathBuf>,
    },
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print the effective settings and base URL
    Show,

    /// Change one saved setting
    Set {
        key: SettingKey,
        value: String,
    },

    /// Print the config directory
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SettingKey {
    Schema,
    Host,
    Port,
    Path,
    Interval,
    Events,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
