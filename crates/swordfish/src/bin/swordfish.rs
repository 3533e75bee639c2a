//! CLI entrypoint for swordfish.

#[path = "swordfish/cli.rs"]
mod cli;
#[path = "swordfish/completions.rs"]
mod completions;
#[path = "swordfish/prompt.rs"]
mod prompt;
#[path = "swordfish/run.rs"]
mod run;
#[path = "swordfish/setup.rs"]
mod setup;
#[path = "swordfish/style.rs"]
mod style;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use style::Tone;

fn main() {
    if let Err(err) = run() {
        let message = format_error_with_tip(&err);
        eprintln!(
            "{}",
            style::paint_stderr(Tone::Error, format!("Error: {message}"))
        );
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let raw_args: Vec<String> = std::env::args().collect();
    let cli = match Cli::try_parse_from(&raw_args) {
        Ok(cli) => cli,
        Err(err) => {
            if err.kind() == ErrorKind::InvalidSubcommand {
                let suggestion = raw_args.get(1).and_then(|input| suggest_subcommand(input));
                if let Some(suggestion) = suggestion {
                    eprintln!("Did you mean: {suggestion}?");
                }
            }
            err.exit();
        }
    };
    init_tracing(cli.verbose);
    match cli.command {
        Command::Setup { toml, force } => setup::run_setup(toml, force),
        Command::Balance(args) => run::run_balance(&args),
        Command::Breakpoints(args) => run::run_breakpoints(&args),
        Command::Completions { shell } => completions::run_completions(shell),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn format_error_with_tip(err: &anyhow::Error) -> String {
    let message = err.to_string();
    let tip = if message.contains("not compatible with this minoTour") {
        Some("Tip: install a swordfish release listed above, or upgrade minoTour.")
    } else if message.contains("configuration document not found") {
        Some("Tip: run `swordfish setup --toml <path>` to create one.")
    } else if message.contains("preset file not found") {
        Some("Tip: pass --presets with a TOML holding [chunk_settings] and [unblock_behaviour].")
    } else if message.contains("minoTour unavailable") {
        Some("Tip: check --mt-host/--mt-port and that minoTour is running.")
    } else if message.contains("access token") {
        Some("Tip: pass --mt-key or set SWORDFISH_MT_KEY.")
    } else {
        None
    };
    match tip {
        Some(tip) => format!("{message}\n{tip}"),
        None => message,
    }
}

fn suggest_subcommand(input: &str) -> Option<&'static str> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    ["setup", "balance", "breakpoints", "completions"]
        .into_iter()
        .map(|candidate| (levenshtein(input, candidate), candidate))
        .min_by_key(|(score, _)| *score)
        .filter(|(score, _)| *score <= 2)
        .map(|(_, candidate)| candidate)
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
