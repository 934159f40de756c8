//! Clap derive structures for the `moodcast` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// moodcast -- live weather feed with mood recommendations
#[derive(Debug, Parser)]
#[command(
    name = "moodcast",
    version,
    about = "Live weather readings and mood recommendations from the command line",
    long_about = "Follows a live weather feed over a WebSocket pub/sub broker, scores\n\
        each reading into a mood recommendation, and answers one-shot queries\n\
        against the weather and reverse-geocoding services.",
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
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "MOODCAST_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Broker WebSocket URL (overrides config)
    #[arg(long, short = 'b', env = "MOODCAST_BROKER_URL", global = true)]
    pub broker: Option<String>,

    /// Weather REST service base URL (overrides config)
    #[arg(long, env = "MOODCAST_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Reverse-geocoding service base URL (overrides config)
    #[arg(long, env = "MOODCAST_GEOCODER_URL", global = true)]
    pub geocoder_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MOODCAST_OUTPUT",
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

    /// Accept self-signed TLS certificates from REST services
    #[arg(long, short = 'k', env = "MOODCAST_INSECURE", global = true)]
    pub insecure: bool,

    /// REST request timeout in seconds (overrides config)
    #[arg(long, env = "MOODCAST_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables and summaries (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one document per line)
    JsonCompact,
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
    /// Follow the live feed for a location until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// List the built-in cities
    Cities,

    /// Score a hypothetical reading
    Mood(MoodArgs),

    /// Resolve coordinates to a place name
    Locate(LocateArgs),

    /// Fetch current conditions once over REST
    Current(PlaceArgs),

    /// Inspect configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Place selection ──────────────────────────────────────────────────

/// Either a catalog city or a coordinate pair.
#[derive(Debug, Args)]
pub struct PlaceArgs {
    /// Built-in city name (see `moodcast cities`)
    #[arg(long, conflicts_with_all = ["lat", "lon"])]
    pub city: Option<String>,

    /// Latitude in decimal degrees
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub place: PlaceArgs,

    /// Exit after this many seconds instead of waiting for Ctrl-C
    #[arg(long, value_name = "SECONDS")]
    pub duration: Option<u64>,
}

#[derive(Debug, Args)]
pub struct MoodArgs {
    /// Pressure in hPa
    #[arg(long)]
    pub pressure: f64,

    /// Cloud cover in percent
    #[arg(long)]
    pub clouds: f64,

    /// Temperature in degrees Celsius
    #[arg(long, default_value_t = 15.0, allow_negative_numbers = true)]
    pub temperature: f64,

    /// Precipitation over the last hour, mm
    #[arg(long)]
    pub rain: Option<f64>,

    /// Wind speed in m/s
    #[arg(long)]
    pub wind: Option<f64>,

    /// Score as if the sun has already set
    #[arg(long)]
    pub after_sunset: bool,
}

#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
