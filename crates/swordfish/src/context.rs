//! Run/task context: which remote experiment record the loop polls.

use crate::error::SwordfishError;

/// Run identifier used when instrument integration is disabled.
pub const FALLBACK_RUN_ID: &str = "ac6ac9b8a4d1f3c3b94cc3dd0b37b3a7d9e0c8f1";

/// Source of the run identifier, consulted once at startup.
///
/// The instrument-control connection lives behind this trait so the loop
/// never depends on it directly.
pub trait RunResolver {
    /// Resolve the identifier of the run being sequenced.
    fn resolve_run_id(&self) -> Result<String, SwordfishError>;
}

/// A run identifier supplied by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitRun(pub String);

impl RunResolver for ExplicitRun {
    fn resolve_run_id(&self) -> Result<String, SwordfishError> {
        let run_id = self.0.trim();
        if run_id.is_empty() {
            return Err(SwordfishError::RunContext("run id is empty".into()));
        }
        Ok(run_id.to_string())
    }
}

/// Fixed identifier for testing without an instrument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FallbackRun;

impl RunResolver for FallbackRun {
    fn resolve_run_id(&self) -> Result<String, SwordfishError> {
        Ok(FALLBACK_RUN_ID.to_string())
    }
}

/// Identifiers linking the loop to one remote experiment.
///
/// The run id is fixed for the process lifetime. The flowcell and job ids
/// are discovered lazily in breakpoint mode and kept once found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    /// Run identifier.
    pub run_id: String,
    /// Flowcell reported by the run record.
    pub flowcell_id: Option<String>,
    /// Breakpoint-detection job attached to the flowcell.
    pub job_id: Option<u64>,
}

impl RunContext {
    /// Resolve the run id through `resolver`.
    pub fn resolve(resolver: &dyn RunResolver) -> Result<Self, SwordfishError> {
        Ok(Self {
            run_id: resolver.resolve_run_id()?,
            flowcell_id: None,
            job_id: None,
        })
    }
}
