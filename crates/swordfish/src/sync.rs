//! Live configuration synchronization loop.
//!
//! ```text
//! READY -> POLLING_RUN -> POLLING_TASK -> FETCHING_DATA
//!     -> MERGING_AND_WRITING -> SLEEPING -> POLLING_RUN ...
//! ```
//!
//! Context resolution happens once in [`SyncLoop::start`], before a loop
//! exists, and is the only fallible step. Every later condition (not found, no content, decode
//! failures, malformed updates, write failures) is logged and the cycle ends
//! early; the loop always sleeps the configured interval and polls again.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::client::{ApiReply, StatusClient};
use crate::clock::Clock;
use crate::context::{RunContext, RunResolver};
use crate::document::ConfigDocument;
use crate::endpoints::Endpoint;
use crate::error::SwordfishError;
use crate::merge::merge_targets;
use crate::payload::{Breakpoint, ConditionUpdates, FlowcellTask, RunRecord, TargetPayload};
use crate::presets::PresetBundle;
use crate::settings::{ExperimentMode, SyncSettings};
use crate::store::{ConfigStore, WriteOutcome};

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Context resolved and documents loaded; no cycle has run yet.
    Ready,
    /// Checking that minoTour knows the run.
    PollingRun,
    /// Checking that a swordfish task exists for the run.
    PollingTask,
    /// Fetching targets or breakpoints.
    FetchingData,
    /// Merging into the live document and persisting it.
    MergingAndWriting,
    /// Waiting out the polling interval.
    Sleeping,
}

/// How one cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The live document was replaced.
    Written {
        /// Barcodes touched by the update.
        barcodes: usize,
        /// Targets held by those barcodes after merging.
        targets: usize,
    },
    /// The merged document matched the live file byte for byte.
    Unchanged,
    /// minoTour had nothing new (204 or an empty update).
    NoData,
    /// minoTour does not know the run yet.
    RunNotFound,
    /// No swordfish task is attached to the run yet.
    TaskNotFound,
    /// Breakpoint mode is still waiting for a flowcell or job id.
    NotReady,
    /// An error was logged and the write skipped.
    Failed,
}

/// The synchronization state machine.
pub struct SyncLoop {
    client: StatusClient,
    store: ConfigStore,
    original: ConfigDocument,
    presets: Option<PresetBundle>,
    settings: SyncSettings,
    context: RunContext,
    clock: Arc<dyn Clock>,
    state: SyncState,
}

impl std::fmt::Debug for SyncLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncLoop")
            .field("client", &self.client)
            .field("store", &self.store)
            .field("settings", &self.settings)
            .field("context", &self.context)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SyncLoop {
    /// Resolve the run context, load the original document and presets, and
    /// seed the live document if it does not exist yet.
    ///
    /// Breakpoint mode requires a preset file.
    pub fn start(
        client: StatusClient,
        store: ConfigStore,
        presets_path: Option<&Path>,
        settings: SyncSettings,
        resolver: &dyn RunResolver,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SwordfishError> {
        let context = RunContext::resolve(resolver)?;
        let original = store.load_original()?;
        let presets = match presets_path {
            Some(path) => Some(PresetBundle::load(path)?),
            None if matches!(settings.mode, ExperimentMode::Breakpoints { .. }) => {
                return Err(SwordfishError::MissingPresets(
                    "breakpoint mode needs a preset file".into(),
                ));
            }
            None => None,
        };
        if store.seed_live(&original)? == WriteOutcome::Written {
            info!(path = %store.live_path().display(), "seeded live document from original");
        }
        info!(
            run_id = %context.run_id,
            original = %store.original_path().display(),
            mode = settings.mode.name(),
            interval_secs = settings.interval.as_secs(),
            "synchronization context resolved"
        );
        Ok(Self {
            client,
            store,
            original,
            presets,
            settings,
            context,
            clock,
            state: SyncState::Ready,
        })
    }

    /// Last state entered.
    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Run context, including any ids discovered so far.
    #[must_use]
    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Original and live document paths.
    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Poll forever.
    pub fn run(mut self) -> ! {
        loop {
            self.run_cycle();
        }
    }

    /// One poll followed by the interval sleep.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let outcome = self.poll_once();
        debug!(?outcome, "cycle finished");
        self.state = SyncState::Sleeping;
        self.clock.sleep(self.settings.interval);
        outcome
    }

    /// One poll without sleeping afterwards.
    pub fn poll_once(&mut self) -> CycleOutcome {
        match self.poll() {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(run_id = %self.context.run_id, "sync cycle failed: {err}");
                CycleOutcome::Failed
            }
        }
    }

    fn poll(&mut self) -> Result<CycleOutcome, SwordfishError> {
        self.state = SyncState::PollingRun;
        if let Some(outcome) = self.poll_run()? {
            return Ok(outcome);
        }

        self.state = SyncState::PollingTask;
        let run_id = self.context.run_id.clone();
        match self
            .client
            .get_status(Endpoint::TaskValid, &[("run_id", run_id.as_str())])?
        {
            ApiReply::Ok(()) | ApiReply::NoContent => {}
            ApiReply::NotFound => {
                warn!(run_id = %run_id, "no swordfish task for this run yet");
                return Ok(CycleOutcome::TaskNotFound);
            }
            _ => return Ok(CycleOutcome::Failed),
        }

        self.state = SyncState::FetchingData;
        let payload = match self.fetch()? {
            Ok(payload) => payload,
            Err(outcome) => return Ok(outcome),
        };

        self.state = SyncState::MergingAndWriting;
        Ok(self.merge_and_write(payload.into_updates()))
    }

    /// `Some` ends the cycle early.
    fn poll_run(&mut self) -> Result<Option<CycleOutcome>, SwordfishError> {
        let run_id = self.context.run_id.clone();
        let path = [("run_id", run_id.as_str())];
        let needs_flowcell = matches!(self.settings.mode, ExperimentMode::Breakpoints { .. })
            && self.context.flowcell_id.is_none();
        let reply = if needs_flowcell {
            match self.client.get_json::<RunRecord>(Endpoint::RunValid, &path, &[])? {
                ApiReply::Ok(record) => {
                    self.context.flowcell_id = record.flowcell_id();
                    if let Some(flowcell_id) = &self.context.flowcell_id {
                        info!(run_id = %run_id, flowcell_id = %flowcell_id, "run is on flowcell");
                    }
                    ApiReply::Ok(())
                }
                ApiReply::NoContent => ApiReply::NoContent,
                ApiReply::NotFound => ApiReply::NotFound,
                ApiReply::Status(status) => ApiReply::Status(status),
                ApiReply::Undecodable(message) => ApiReply::Undecodable(message),
                ApiReply::Unreachable(message) => ApiReply::Unreachable(message),
            }
        } else {
            self.client.get_status(Endpoint::RunValid, &path)?
        };
        Ok(match reply {
            ApiReply::Ok(()) | ApiReply::NoContent => None,
            ApiReply::NotFound => {
                warn!(run_id = %run_id, "run not registered with minoTour yet");
                Some(CycleOutcome::RunNotFound)
            }
            _ => Some(CycleOutcome::Failed),
        })
    }

    /// The outer `Err` is a programmer error; the inner one ends the cycle.
    fn fetch(&mut self) -> Result<Result<TargetPayload, CycleOutcome>, SwordfishError> {
        let run_id = self.context.run_id.clone();
        match self.settings.mode {
            ExperimentMode::Balance { threshold } => {
                let threshold = threshold.to_string();
                let reply = self.client.get_json::<ConditionUpdates>(
                    Endpoint::Targets,
                    &[("run_id", run_id.as_str())],
                    &[("threshold", threshold.as_str())],
                )?;
                Ok(data_or_outcome(reply, &run_id).map(TargetPayload::Balance))
            }
            ExperimentMode::Breakpoints {
                min_diff,
                ploidy,
                reads_per_bin,
            } => {
                let Some(job_id) = self.job_id()? else {
                    return Ok(Err(CycleOutcome::NotReady));
                };
                let job_id = job_id.to_string();
                let min_diff = min_diff.to_string();
                let ploidy = ploidy.to_string();
                let bin_slice = reads_per_bin.to_string();
                let reply = self
                    .client
                    .get_json::<BTreeMap<String, Option<Vec<Breakpoint>>>>(
                        Endpoint::Breakpoints,
                        &[("job_id", job_id.as_str())],
                        &[
                            ("min_diff", min_diff.as_str()),
                            ("ploidy", ploidy.as_str()),
                            ("bin_slice", bin_slice.as_str()),
                        ],
                    )?;
                Ok(data_or_outcome(reply, &run_id).map(TargetPayload::Breakpoints))
            }
        }
    }

    /// Cached job id, looked up through the flowcell on first use.
    fn job_id(&mut self) -> Result<Option<u64>, SwordfishError> {
        if let Some(job_id) = self.context.job_id {
            return Ok(Some(job_id));
        }
        let Some(flowcell_id) = self.context.flowcell_id.clone() else {
            warn!(run_id = %self.context.run_id, "run record does not name a flowcell yet");
            return Ok(None);
        };
        match self.client.get_json::<FlowcellTask>(
            Endpoint::FlowcellTask,
            &[("flowcell_id", flowcell_id.as_str())],
            &[],
        )? {
            ApiReply::Ok(task) => {
                info!(flowcell_id = %flowcell_id, job_id = task.id, "found breakpoint job");
                self.context.job_id = Some(task.id);
                Ok(Some(task.id))
            }
            ApiReply::NotFound | ApiReply::NoContent => {
                warn!(flowcell_id = %flowcell_id, "no breakpoint job for flowcell yet");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    fn merge_and_write(&mut self, updates: ConditionUpdates) -> CycleOutcome {
        if updates.is_empty() {
            warn!(run_id = %self.context.run_id, "update named no barcodes");
            return CycleOutcome::NoData;
        }
        let previous = match self.store.load_live() {
            Ok(Some(document)) => document,
            Ok(None) => self.original.clone(),
            Err(err) => {
                error!("live document unreadable, not overwriting it: {err}");
                return CycleOutcome::Failed;
            }
        };
        // Barcodes the live file lacks still exist in the original.
        let existing = self.original.next_live(&previous, BTreeMap::new());
        let merged = match merge_targets(&updates, &existing, self.presets.as_ref()) {
            Ok(merged) => merged,
            Err(err) => {
                error!("{err}; skipping write");
                return CycleOutcome::Failed;
            }
        };
        let barcodes = merged.len();
        let targets = merged.values().map(|condition| condition.targets.len()).sum();
        let next = self.original.next_live(&previous, merged);
        match self.store.write_live(&next) {
            Ok(WriteOutcome::Written) => {
                info!(
                    path = %self.store.live_path().display(),
                    barcodes,
                    targets,
                    "live document updated"
                );
                CycleOutcome::Written { barcodes, targets }
            }
            Ok(WriteOutcome::Unchanged) => CycleOutcome::Unchanged,
            Err(err) => {
                error!("{err}");
                CycleOutcome::Failed
            }
        }
    }
}

fn data_or_outcome<T>(reply: ApiReply<T>, run_id: &str) -> Result<T, CycleOutcome> {
    match reply {
        ApiReply::Ok(data) => Ok(data),
        ApiReply::NoContent | ApiReply::NotFound => {
            warn!(run_id = %run_id, "no new data from minoTour this cycle");
            Err(CycleOutcome::NoData)
        }
        _ => Err(CycleOutcome::Failed),
    }
}
