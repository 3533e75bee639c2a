mod common;

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use common::{ok, status, write_fixtures, ScriptedTransport};
use swordfish::clock::ManualClock;
use swordfish::context::{ExplicitRun, FallbackRun, FALLBACK_RUN_ID};
use swordfish::document::{Action, ConfigDocument};
use swordfish::settings::{ExperimentMode, SyncSettings};
use swordfish::store::ConfigStore;
use swordfish::sync::{CycleOutcome, SyncLoop, SyncState};
use swordfish::SwordfishError;

const RUN: &str = "run-7";

fn balance() -> SyncSettings {
    SyncSettings::new(60, ExperimentMode::balance(50).unwrap()).unwrap()
}

fn breakpoints() -> SyncSettings {
    SyncSettings::new(90, ExperimentMode::breakpoints(0.5, 2, 100).unwrap()).unwrap()
}

fn start(
    transport: &ScriptedTransport,
    document: &Path,
    presets: Option<&Path>,
    settings: SyncSettings,
    clock: &ManualClock,
) -> SyncLoop {
    SyncLoop::start(
        transport.client(),
        ConfigStore::new(document),
        presets,
        settings,
        &ExplicitRun(RUN.into()),
        Arc::new(clock.clone()),
    )
    .unwrap()
}

fn live(document: &Path) -> ConfigDocument {
    ConfigStore::new(document).load_live().unwrap().unwrap()
}

#[test]
fn not_found_is_retried_until_the_run_appears() {
    let dir = tempfile::tempdir().unwrap();
    let (document, presets) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![status(404), status(404), ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![ok(r#"{"barcode07": {"targets": ["chr1:300-400"]}}"#)],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, Some(&presets), balance(), &clock);

    assert_eq!(sync.run_cycle(), CycleOutcome::RunNotFound);
    assert_eq!(sync.run_cycle(), CycleOutcome::RunNotFound);
    assert_eq!(
        sync.run_cycle(),
        CycleOutcome::Written {
            barcodes: 1,
            targets: 2
        }
    );
    assert_eq!(transport.count("/targets/"), 1);
    assert_eq!(transport.count("/tasks/"), 1);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(60); 3]);
    assert_eq!(sync.state(), SyncState::Sleeping);

    let barcode = &live(&document).conditions.barcodes["barcode07"];
    assert_eq!(
        barcode.targets,
        vec!["chr1:100-200".to_string(), "chr1:300-400".to_string()]
    );
}

#[test]
fn original_document_is_never_modified() {
    let dir = tempfile::tempdir().unwrap();
    let (document, presets) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![ok(r#"{"barcode12": {"targets": ["chr4:1-50"]}}"#)],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, Some(&presets), balance(), &clock);
    assert!(matches!(sync.run_cycle(), CycleOutcome::Written { .. }));
    assert_eq!(fs::read_to_string(&document).unwrap(), common::DOCUMENT);
    assert!(dir.path().join("exp.toml_live").is_file());
    assert!(!dir.path().join("exp.toml_live.part").exists());
}

#[test]
fn no_content_leaves_live_document_byte_identical() {
    let dir = tempfile::tempdir().unwrap();
    let (document, presets) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![
                ok(r#"{"barcode07": {"targets": ["chr1:300-400"]}}"#),
                status(204),
            ],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, Some(&presets), balance(), &clock);
    assert!(matches!(sync.run_cycle(), CycleOutcome::Written { .. }));
    let live_path = sync.store().live_path().to_path_buf();
    let before = fs::read(&live_path).unwrap();

    assert_eq!(sync.run_cycle(), CycleOutcome::NoData);
    assert_eq!(sync.run_cycle(), CycleOutcome::NoData);
    assert_eq!(fs::read(&live_path).unwrap(), before);
}

#[test]
fn targets_accrue_and_presets_win_across_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let (document, presets) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![
                ok(r#"{"barcode07": {"targets": ["chr1:300-400"], "single_on": "stop_receiving"}}"#),
                ok(r#"{"barcode07": {"targets": ["chr2:5-9"]}, "barcode12": {"targets": ["chr3:1-2"]}}"#),
            ],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, Some(&presets), balance(), &clock);

    assert!(matches!(sync.run_cycle(), CycleOutcome::Written { .. }));
    let first = live(&document).conditions.barcodes["barcode07"].target_set();
    assert_eq!(
        sync.run_cycle(),
        CycleOutcome::Written {
            barcodes: 2,
            targets: 4
        }
    );
    let document_now = live(&document);
    let second = document_now.conditions.barcodes["barcode07"].target_set();
    assert!(second.is_superset(&first));
    assert_eq!(second.len(), 3);

    for barcode in ["barcode07", "barcode12"] {
        let condition = &document_now.conditions.barcodes[barcode];
        assert_eq!(condition.single_on, Action::Unblock);
        assert_eq!(condition.min_chunks, 0);
        assert_eq!(condition.max_chunks, 4);
    }
    // The new barcode inherits the classified behaviour for unstamped fields.
    assert_eq!(
        document_now.conditions.barcodes["barcode12"].multi_on,
        Action::StopReceiving
    );
    assert_eq!(document_now.conditions.reference.as_deref(), Some("/data/hg38.mmi"));

    // The last reply repeats: merging it again changes nothing.
    assert_eq!(sync.run_cycle(), CycleOutcome::Unchanged);
}

#[test]
fn missing_task_skips_the_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let (document, _) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![status(404)]);
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, None, balance(), &clock);
    assert_eq!(sync.run_cycle(), CycleOutcome::TaskNotFound);
    assert_eq!(sync.run_cycle(), CycleOutcome::TaskNotFound);
    assert_eq!(transport.count("/targets/"), 0);
    assert_eq!(clock.sleep_calls(), 2);
}

#[test]
fn malformed_or_undecodable_updates_skip_the_write() {
    let dir = tempfile::tempdir().unwrap();
    let (document, presets) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![ok(r#"{"barcode07": null}"#), ok("<html>oops</html>")],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, Some(&presets), balance(), &clock);
    let seeded = fs::read(sync.store().live_path()).unwrap();

    assert_eq!(sync.run_cycle(), CycleOutcome::Failed);
    assert_eq!(sync.run_cycle(), CycleOutcome::Failed);
    assert_eq!(fs::read(sync.store().live_path()).unwrap(), seeded);
}

#[test]
fn threshold_and_token_are_sent_with_each_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let (document, _) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route("/targets/", vec![status(204)]);
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, None, balance(), &clock);
    sync.run_cycle();

    let requests = transport.requests();
    let fetch = requests
        .iter()
        .find(|request| request.url.contains("/targets/"))
        .unwrap();
    assert_eq!(
        fetch.url,
        "http://mt.test:8100/api/v1/readfish/swordfish/targets/run-7/"
    );
    assert_eq!(
        fetch.query,
        vec![("threshold".to_string(), "50".to_string())]
    );
    assert!(requests
        .iter()
        .all(|request| request.authorization == "Token secret"));
}

#[test]
fn breakpoint_mode_discovers_the_job_once() {
    let dir = tempfile::tempdir().unwrap();
    let (document, presets) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok(r#"{"flowcell": 12, "name": "run-7"}"#)])
        .route("/tasks/", vec![ok("{}")])
        .route("/flowcells/12/task/", vec![ok(r#"{"id": 99}"#)])
        .route(
            "/breakpoints/99/",
            vec![ok(
                r#"{"barcode07": [{"contig": "chr2", "start": 10, "end": 20}], "barcode09": []}"#,
            )],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, Some(&presets), breakpoints(), &clock);

    assert_eq!(
        sync.run_cycle(),
        CycleOutcome::Written {
            barcodes: 1,
            targets: 3
        }
    );
    assert_eq!(sync.context().flowcell_id.as_deref(), Some("12"));
    assert_eq!(sync.context().job_id, Some(99));
    assert_eq!(sync.run_cycle(), CycleOutcome::Unchanged);
    assert_eq!(transport.count("/flowcells/"), 1);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(90); 2]);

    let barcode = &live(&document).conditions.barcodes["barcode07"];
    assert_eq!(
        barcode.targets,
        vec![
            "chr1:100-200".to_string(),
            "chr2,10,20,+".to_string(),
            "chr2,10,20,-".to_string(),
        ]
    );
    assert!(!live(&document).conditions.barcodes.contains_key("barcode09"));

    let requests = transport.requests();
    let fetch = requests
        .iter()
        .find(|request| request.url.contains("/breakpoints/"))
        .unwrap();
    assert_eq!(
        fetch.query,
        vec![
            ("min_diff".to_string(), "0.5".to_string()),
            ("ploidy".to_string(), "2".to_string()),
            ("bin_slice".to_string(), "100".to_string()),
        ]
    );
}

#[test]
fn breakpoint_mode_waits_for_a_flowcell() {
    let dir = tempfile::tempdir().unwrap();
    let (document, presets) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}"), ok(r#"{"flowcell": "FAT12345"}"#)])
        .route("/tasks/", vec![ok("{}")])
        .route("/flowcells/", vec![status(404), ok(r#"{"job_id": 5}"#)])
        .route("/breakpoints/", vec![status(204)]);
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, Some(&presets), breakpoints(), &clock);

    assert_eq!(sync.run_cycle(), CycleOutcome::NotReady);
    assert_eq!(sync.run_cycle(), CycleOutcome::NotReady);
    assert_eq!(sync.run_cycle(), CycleOutcome::NoData);
    assert_eq!(sync.context().flowcell_id.as_deref(), Some("FAT12345"));
    assert_eq!(sync.context().job_id, Some(5));
}

#[test]
fn breakpoint_mode_requires_presets() {
    let dir = tempfile::tempdir().unwrap();
    let (document, _) = write_fixtures(dir.path());
    let err = SyncLoop::start(
        ScriptedTransport::new().client(),
        ConfigStore::new(&document),
        None,
        breakpoints(),
        &FallbackRun,
        Arc::new(ManualClock::new()),
    )
    .unwrap_err();
    assert!(matches!(err, SwordfishError::MissingPresets(_)));
}

#[test]
fn startup_failures_are_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let start_with = |document: &Path, presets: Option<&Path>, run: &str| {
        SyncLoop::start(
            ScriptedTransport::new().client(),
            ConfigStore::new(document),
            presets,
            balance(),
            &ExplicitRun(run.into()),
            Arc::new(ManualClock::new()),
        )
    };
    let missing = dir.path().join("absent.toml");
    assert!(matches!(
        start_with(&missing, None, RUN),
        Err(SwordfishError::MissingDocument(_))
    ));

    let (document, _) = write_fixtures(dir.path());
    let no_presets = dir.path().join("nope.toml");
    assert!(matches!(
        start_with(&document, Some(&no_presets), RUN),
        Err(SwordfishError::MissingPresets(_))
    ));
    assert!(matches!(
        start_with(&document, None, " "),
        Err(SwordfishError::RunContext(_))
    ));
    assert!(!dir.path().join("exp.toml_live").exists());
}

#[test]
fn existing_live_document_is_kept_at_startup() {
    let dir = tempfile::tempdir().unwrap();
    let (document, _) = write_fixtures(dir.path());
    let live_path = dir.path().join("exp.toml_live");
    let accrued = common::DOCUMENT.replace(
        r#"targets = ["chr1:100-200"]"#,
        r#"targets = ["chr1:100-200", "chr9:1-2"]"#,
    );
    fs::write(&live_path, &accrued).unwrap();

    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![ok(r#"{"barcode07": {"targets": ["chr1:300-400"]}}"#)],
        );
    let clock = ManualClock::new();
    let sync = SyncLoop::start(
        transport.client(),
        ConfigStore::new(&document),
        None,
        balance(),
        &FallbackRun,
        Arc::new(clock.clone()),
    )
    .unwrap();
    assert_eq!(fs::read_to_string(&live_path).unwrap(), accrued);
    assert_eq!(sync.context().run_id, FALLBACK_RUN_ID);
    assert_eq!(sync.state(), SyncState::Ready);

    let mut sync = sync;
    assert_eq!(
        sync.run_cycle(),
        CycleOutcome::Written {
            barcodes: 1,
            targets: 3
        }
    );
    assert!(live(&document).conditions.barcodes["barcode07"]
        .targets
        .contains(&"chr9:1-2".to_string()));
}

#[test]
fn unreadable_live_document_is_not_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let (document, _) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![ok(r#"{"barcode07": {"targets": ["chr1:300-400"]}}"#)],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, None, balance(), &clock);
    let live_path = sync.store().live_path().to_path_buf();
    fs::write(&live_path, "not [valid toml").unwrap();

    assert_eq!(sync.run_cycle(), CycleOutcome::Failed);
    assert_eq!(fs::read_to_string(&live_path).unwrap(), "not [valid toml");
}

#[test]
fn crossed_chunk_bounds_never_reach_the_live_document() {
    let dir = tempfile::tempdir().unwrap();
    let (document, _) = write_fixtures(dir.path());
    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![
                ok(r#"{"barcode07": {"targets": ["chr1:300-400"], "min_chunks": 12}}"#),
                ok(r#"{"barcode07": {"targets": ["chr2:5-9"]}}"#),
            ],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, None, balance(), &clock);
    let live_path = sync.store().live_path().to_path_buf();
    let seeded = fs::read(&live_path).unwrap();

    assert_eq!(sync.run_cycle(), CycleOutcome::Failed);
    assert_eq!(fs::read(&live_path).unwrap(), seeded);

    // The loop keeps accruing once the remote sends a usable update.
    assert_eq!(
        sync.run_cycle(),
        CycleOutcome::Written {
            barcodes: 1,
            targets: 2
        }
    );
    let barcode = &live(&document).conditions.barcodes["barcode07"];
    assert_eq!(barcode.min_chunks, 1);
    assert_eq!(barcode.max_chunks, 8);
    assert_eq!(
        barcode.targets,
        vec!["chr1:100-200".to_string(), "chr2:5-9".to_string()]
    );
}

#[test]
fn barcodes_missing_from_a_stale_live_document_come_from_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let (document, _) = write_fixtures(dir.path());
    let live_path = dir.path().join("exp.toml_live");
    let stale = common::DOCUMENT
        .split("[conditions.barcode07]")
        .next()
        .unwrap();
    fs::write(&live_path, stale).unwrap();

    let transport = ScriptedTransport::new()
        .route("/runs/", vec![ok("{}")])
        .route("/tasks/", vec![ok("{}")])
        .route(
            "/targets/",
            vec![ok(r#"{"barcode07": {"targets": ["chr1:300-400"]}}"#)],
        );
    let clock = ManualClock::new();
    let mut sync = start(&transport, &document, None, balance(), &clock);
    assert_eq!(
        sync.run_cycle(),
        CycleOutcome::Written {
            barcodes: 1,
            targets: 2
        }
    );

    let barcode = &live(&document).conditions.barcodes["barcode07"];
    assert_eq!(
        barcode.targets,
        vec!["chr1:100-200".to_string(), "chr1:300-400".to_string()]
    );
    assert_eq!((barcode.min_chunks, barcode.max_chunks), (1, 8));
    assert_eq!(barcode.single_on, Action::Proceed);
    assert_eq!(barcode.single_off, Action::StopReceiving);
}
