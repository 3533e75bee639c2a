//! CLI definitions for swordfish.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use swordfish::settings::{
    DEFAULT_MIN_DIFF, DEFAULT_PLOIDY, DEFAULT_READS_PER_BIN, DEFAULT_THRESHOLD,
    MIN_POLL_INTERVAL_SECS,
};

#[derive(Debug, Parser)]
#[command(
    name = "swordfish",
    version,
    about = "Keep a readfish live TOML in step with targets discovered by minoTour",
    infer_subcommands = true,
    after_help = "Examples:\n  swordfish setup --toml exp.toml\n  swordfish balance --toml exp.toml --mt-key <KEY> --run-id <RUN>\n  swordfish breakpoints --toml exp.toml --presets presets.toml --no-minknow"
)]
pub struct Cli {
    /// Show debug logging.
    #[arg(long, short, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write an initial readfish TOML from a few questions.
    Setup {
        /// Where to write the configuration document.
        #[arg(long)]
        toml: PathBuf,
        /// Overwrite an existing file without asking.
        #[arg(long)]
        force: bool,
    },
    /// Balance barcode coverage: unblock amplicons past a coverage threshold.
    Balance(BalanceArgs),
    /// Target breakpoints found by minoTour's CNV analysis.
    Breakpoints(BreakpointArgs),
    /// Generate shell completions.
    Completions {
        /// Target shell.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// minoTour connection.
#[derive(Debug, Args)]
pub struct ServiceArgs {
    /// minoTour API key.
    #[arg(long = "mt-key", env = "SWORDFISH_MT_KEY", hide_env_values = true)]
    pub mt_key: String,
    /// minoTour host.
    #[arg(long = "mt-host", default_value = "localhost")]
    pub mt_host: String,
    /// minoTour port (443 switches to https).
    #[arg(long = "mt-port", default_value_t = 8100)]
    pub mt_port: u16,
}

/// Options shared by both experiment modes.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// The readfish TOML to keep updated; the live copy is written next to it.
    #[arg(long)]
    pub toml: PathBuf,
    /// Seconds between polls.
    #[arg(long, short = 'f', default_value_t = MIN_POLL_INTERVAL_SECS)]
    pub freq: u64,
    /// Run identifier registered with minoTour.
    #[arg(long = "run-id", required_unless_present = "no_minknow")]
    pub run_id: Option<String>,
    /// Do not look the run up on the sequencer; use a fixed test run id.
    #[arg(long = "no-minknow")]
    pub no_minknow: bool,
}

#[derive(Debug, Args)]
pub struct BalanceArgs {
    #[command(flatten)]
    pub service: ServiceArgs,
    #[command(flatten)]
    pub sync: SyncArgs,
    /// Coverage at which a barcode's amplicon is unblocked.
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: u32,
    /// Optional chunk/unblock presets stamped onto updated barcodes.
    #[arg(long)]
    pub presets: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BreakpointArgs {
    #[command(flatten)]
    pub service: ServiceArgs,
    #[command(flatten)]
    pub sync: SyncArgs,
    /// Chunk/unblock presets stamped onto updated barcodes.
    #[arg(long)]
    pub presets: PathBuf,
    /// Minimum copy number difference between adjacent bins.
    #[arg(long = "min-diff", default_value_t = DEFAULT_MIN_DIFF)]
    pub min_diff: f64,
    /// Expected ploidy of the sample.
    #[arg(long, default_value_t = DEFAULT_PLOIDY)]
    pub ploidy: u32,
    /// Reads per CNV bin.
    #[arg(long = "reads-per-bin", default_value_t = DEFAULT_READS_PER_BIN)]
    pub reads_per_bin: u32,
}
