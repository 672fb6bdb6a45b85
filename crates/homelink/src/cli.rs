//! Clap derive structures for the `homelink` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// homelink -- command-line client for Homelink smart-home hubs
#[derive(Debug, Parser)]
#[command(
    name = "homelink",
    version,
    about = "Watch and control a Homelink hub from the command line",
    long_about = "A client for Homelink smart-home hubs.\n\n\
        Reads live device state over the hub's push channel, sends command\n\
        workflows over its REST API, and fetches energy analytics on demand.",
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
    /// Hub base URL, e.g. http://192.168.1.50:8080
    #[arg(
        long,
        short = 'H',
        env = "HOMELINK_HUB",
        default_value = "http://localhost:8080",
        global = true
    )]
    pub hub: String,

    /// Request timeout in seconds
    #[arg(long, env = "HOMELINK_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "HOMELINK_OUTPUT",
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
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
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
    /// List current device snapshots
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Follow live state: connectivity, changes, motion edges
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Send a command workflow to one device
    Send(SendArgs),

    /// Fetch the energy analytics report
    #[command(alias = "en")]
    Energy,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Per-Command Args ─────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Show only this device
    pub id: Option<String>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after this many seconds instead of running until Ctrl-C
    #[arg(long)]
    pub duration: Option<u64>,
}

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Target device id
    pub device: String,

    /// Workflow steps, each `action` or `action:key=value,key=value`
    /// (e.g. `turn_on set_brightness:brightness=70`)
    #[arg(required = true)]
    pub steps: Vec<String>,

    /// Seconds to wait for the workflow to finish
    #[arg(long, default_value = "30")]
    pub wait: u64,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
