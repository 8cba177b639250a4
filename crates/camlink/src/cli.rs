//! Clap derive structures for the `camlink` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// camlink -- drive a network-attached action camera
#[derive(Debug, Parser)]
#[command(
    name = "camlink",
    version,
    about = "Control network-attached action cameras from the command line",
    long_about = "Discover, connect to, preview and record with an action camera\n\
        that exposes the camera-info / start-preview / start-record /\n\
        stop-record HTTP control surface.",
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
    /// Config file to use instead of the platform default
    #[arg(long, env = "CAMLINK_CONFIG_FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CAMLINK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Bound for camera-info requests (e.g. "3s", "500ms")
    #[arg(long, global = true)]
    pub info_timeout: Option<humantime::Duration>,

    /// Bound for preview and record commands
    #[arg(long, global = true)]
    pub command_timeout: Option<humantime::Duration>,

    /// Bound for each address probed during a scan
    #[arg(long, global = true)]
    pub scan_timeout: Option<humantime::Duration>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / detail view (default)
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

#[derive(Debug, Clone, ValueEnum)]
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
    /// Connect and show camera model, firmware and battery
    Info(TargetArgs),

    /// Probe candidate addresses and connect to the first camera found
    Scan(ScanArgs),

    /// Start the preview feed and print its stream URL
    Preview(TargetArgs),

    /// Record for a fixed duration, then stop
    #[command(alias = "rec")]
    Record(RecordArgs),

    /// Show, change or validate capture settings
    Settings(SettingsArgs),

    /// Interactive session: issue intents one line at a time
    #[command(alias = "sh")]
    Shell(TargetArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Device commands ──────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Camera address (host, host:port or http:// URL). Without one, the
    /// configured address is used, falling back to a scan.
    pub address: Option<String>,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Probe only these addresses, in this order (repeatable)
    #[arg(long = "candidate", short = 'c')]
    pub candidates: Vec<String>,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// How long to record before stopping (e.g. "30s", "2m")
    #[arg(long, short = 'd', default_value = "10s")]
    pub duration: humantime::Duration,

    /// Override resolution for this recording
    #[arg(long)]
    pub resolution: Option<String>,

    /// Override quality for this recording
    #[arg(long)]
    pub quality: Option<String>,

    /// Override capture mode for this recording
    #[arg(long)]
    pub mode: Option<String>,
}

// ── Settings ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Show configured settings and allowed values
    Show,

    /// Validate and save settings as the configured defaults
    Set {
        /// Assignments such as resolution=3840x2160 quality=medium
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Check assignments without saving them
    Validate {
        #[arg(required = true)]
        pairs: Vec<String>,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Write a config file populated with defaults
    Init {
        /// Default camera address to store
        #[arg(long)]
        address: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Print the config and state file locations
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
