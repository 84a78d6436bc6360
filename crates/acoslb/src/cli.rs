//! Clap derive structures for the `acoslb` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// acoslb -- session cache and AXAPI adapter for A10 ACOS appliances
#[derive(Debug, Parser)]
#[command(
    name = "acoslb",
    version,
    about = "Manage authenticated sessions to A10 ACOS load balancers",
    long_about = "Keeps one authenticated AXAPI session per appliance, refreshes it\n\
        before it expires, and closes every session cleanly on shutdown.\n\n\
        Speaks AXAPI 2.1 (ACOS 2.x) and 3.0 (ACOS 4.x).",
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
    /// Path to the config file
    #[arg(long, short = 'c', env = "ACOSLB_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ACOSLB_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, ValueEnum)]
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

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List configured appliances
    #[command(alias = "dev")]
    Devices,

    /// Show which appliance a tenant is placed on
    Select(SelectArgs),

    /// Print the virtual-port body for an appliance
    Vport(ParamsArgs),

    /// Print the virtual-server body for an appliance
    Vserver(ParamsArgs),

    /// Log into every appliance and report reachability
    Verify,

    /// Keep sessions warm until SIGINT, SIGHUP or SIGTERM
    Run(RunArgs),

    /// Inspect the configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Tenant (project) identifier
    pub tenant: String,
}

#[derive(Debug, Args)]
pub struct ParamsArgs {
    /// Device key from the config file
    pub device: String,

    /// Base options as a JSON object
    #[arg(long, default_value = "{}")]
    pub options: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Verify appliances at startup even if the config does not ask for it
    #[arg(long)]
    pub verify: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration with passwords masked
    Show,
    /// Print the config file path in use
    Path,
}
