//! Shapes of the JSON minoTour returns.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::document::{Action, Condition};

/// Partial condition fields reported for one barcode.
///
/// Every field is optional. An entry with no fields at all carries neither
/// targets nor behaviour and is rejected by the merge engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConditionUpdate {
    pub targets: Option<Vec<String>>,
    pub name: Option<String>,
    pub control: Option<bool>,
    pub min_chunks: Option<u32>,
    pub max_chunks: Option<u32>,
    pub single_on: Option<Action>,
    pub single_off: Option<Action>,
    pub multi_on: Option<Action>,
    pub multi_off: Option<Action>,
    pub no_seq: Option<Action>,
    pub no_map: Option<Action>,
}

impl ConditionUpdate {
    #[must_use]
    pub fn with_targets(targets: Vec<String>) -> Self {
        Self {
            targets: Some(targets),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the remote's advisory fields. Targets are handled by the merge.
    pub fn apply_advisory(&self, condition: &mut Condition) {
        if let Some(name) = &self.name {
            condition.name.clone_from(name);
        }
        if let Some(control) = self.control {
            condition.control = control;
        }
        if let Some(min) = self.min_chunks {
            condition.min_chunks = min;
        }
        if let Some(max) = self.max_chunks {
            condition.max_chunks = max;
        }
        let slots = [
            (self.single_on, &mut condition.single_on),
            (self.single_off, &mut condition.single_off),
            (self.multi_on, &mut condition.multi_on),
            (self.multi_off, &mut condition.multi_off),
            (self.no_seq, &mut condition.no_seq),
            (self.no_map, &mut condition.no_map),
        ];
        for (remote, slot) in slots {
            if let Some(action) = remote {
                *slot = action;
            }
        }
    }
}

/// Barcode keyed updates; `None` marks an entry the service sent as `null`.
pub type ConditionUpdates = BTreeMap<String, Option<ConditionUpdate>>;

/// Breakpoint region reported by a detection job.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Breakpoint {
    pub contig: String,
    pub start: u64,
    pub end: u64,
}

impl Breakpoint {
    /// readfish targets covering both strands of the region.
    #[must_use]
    pub fn targets(&self) -> [String; 2] {
        [
            format!("{},{},{},+", self.contig, self.start, self.end),
            format!("{},{},{},-", self.contig, self.start, self.end),
        ]
    }
}

/// Tagged result of a target fetch, one variant per experiment mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPayload {
    /// Coverage balancing / depletion-enrichment.
    Balance(ConditionUpdates),
    /// Breakpoint detection.
    Breakpoints(BTreeMap<String, Option<Vec<Breakpoint>>>),
}

impl TargetPayload {
    #[must_use]
    pub fn into_updates(self) -> ConditionUpdates {
        match self {
            Self::Balance(updates) => updates,
            // An empty list means nothing was found for that barcode yet.
            Self::Breakpoints(report) => report
                .into_iter()
                .filter(|(_, breakpoints)| {
                    breakpoints
                        .as_ref()
                        .is_none_or(|found| !found.is_empty())
                })
                .map(|(barcode, breakpoints)| {
                    let update = breakpoints.map(|found| {
                        ConditionUpdate::with_targets(
                            found.iter().flat_map(Breakpoint::targets).collect(),
                        )
                    });
                    (barcode, update)
                })
                .collect(),
        }
    }
}

/// Run record returned by the run-validity endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunRecord {
    #[serde(default)]
    pub flowcell: Option<serde_json::Value>,
}

impl RunRecord {
    /// Flowcell identifier as a path segment, whether sent as number or string.
    #[must_use]
    pub fn flowcell_id(&self) -> Option<String> {
        match self.flowcell.as_ref()? {
            serde_json::Value::Number(number) => Some(number.to_string()),
            serde_json::Value::String(text) if !text.trim().is_empty() => {
                Some(text.trim().to_string())
            }
            _ => None,
        }
    }
}

/// Breakpoint-detection task attached to a flowcell.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlowcellTask {
    #[serde(alias = "job_id")]
    pub id: u64,
}
