//! `balance` and `breakpoints`: validate, handshake, then poll forever.

use std::path::Path;
use std::sync::Arc;

use swordfish::client::StatusClient;
use swordfish::clock::{Clock, StdClock};
use swordfish::context::{ExplicitRun, FallbackRun, RunResolver};
use swordfish::gate::validate_connection;
use swordfish::settings::{ExperimentMode, ServiceSettings, SyncSettings};
use swordfish::store::ConfigStore;
use swordfish::sync::SyncLoop;

use crate::cli::{BalanceArgs, BreakpointArgs, ServiceArgs, SyncArgs};
use crate::style::{self, Tone};

pub fn run_balance(args: &BalanceArgs) -> anyhow::Result<()> {
    let mode = ExperimentMode::balance(args.threshold)?;
    let mut echo = common_echo(mode, &args.service, &args.sync);
    echo.push(("threshold", args.threshold.to_string()));
    echo.push(("presets", display_path(args.presets.as_deref())));
    run_sync(&args.service, &args.sync, mode, args.presets.as_deref(), &echo)
}

pub fn run_breakpoints(args: &BreakpointArgs) -> anyhow::Result<()> {
    let mode = ExperimentMode::breakpoints(args.min_diff, args.ploidy, args.reads_per_bin)?;
    let mut echo = common_echo(mode, &args.service, &args.sync);
    echo.push(("presets", args.presets.display().to_string()));
    echo.push(("min-diff", args.min_diff.to_string()));
    echo.push(("ploidy", args.ploidy.to_string()));
    echo.push(("reads-per-bin", args.reads_per_bin.to_string()));
    run_sync(&args.service, &args.sync, mode, Some(args.presets.as_path()), &echo)
}

fn run_sync(
    service: &ServiceArgs,
    sync: &SyncArgs,
    mode: ExperimentMode,
    presets: Option<&Path>,
    echo: &[(&str, String)],
) -> anyhow::Result<()> {
    let service = ServiceSettings::new(&service.mt_host, service.mt_port, &service.mt_key)?;
    let settings = SyncSettings::new(sync.freq, mode)?;
    let resolver: Box<dyn RunResolver> = match &sync.run_id {
        Some(run_id) => Box::new(ExplicitRun(run_id.clone())),
        None if sync.no_minknow => {
            println!(
                "{}",
                style::paint(
                    Tone::Warning,
                    "No sequencer lookup: polling the fixed test run id."
                )
            );
            Box::new(FallbackRun)
        }
        None => anyhow::bail!("no run id: pass --run-id, or --no-minknow to use the test run"),
    };
    style::print_banner(echo);

    let clock: Arc<dyn Clock> = Arc::new(StdClock::new());
    let client = StatusClient::connect(&service, Arc::clone(&clock));
    validate_connection(&client, swordfish::VERSION)?;
    let sync_loop = SyncLoop::start(
        client,
        ConfigStore::new(&sync.toml),
        presets,
        settings,
        resolver.as_ref(),
        clock,
    )?;
    sync_loop.run()
}

fn common_echo(
    mode: ExperimentMode,
    service: &ServiceArgs,
    sync: &SyncArgs,
) -> Vec<(&'static str, String)> {
    vec![
        ("mode", mode.name().to_string()),
        ("toml", sync.toml.display().to_string()),
        ("freq", format!("{}s", sync.freq)),
        (
            "run-id",
            sync.run_id.clone().unwrap_or_else(|| "(test run)".to_string()),
        ),
        ("mt-host", service.mt_host.clone()),
        ("mt-port", service.mt_port.to_string()),
        ("mt-key", "<redacted>".to_string()),
    ]
}

fn display_path(path: Option<&Path>) -> String {
    path.map_or_else(|| "(none)".to_string(), |path| path.display().to_string())
}
