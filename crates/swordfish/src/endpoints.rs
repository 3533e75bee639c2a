//! minoTour swordfish endpoint templates.

#![allow(missing_docs)]

use crate::error::SwordfishError;

const SWORDFISH_BASE: &str = "/readfish/swordfish";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// Liveness and version handshake.
    TestConnect,
    /// Has minoTour registered the run?
    RunValid,
    /// Is a swordfish task attached to the run?
    TaskValid,
    /// Per-barcode targets for a coverage balancing run.
    Targets,
    /// Breakpoint-detection job attached to a flowcell.
    FlowcellTask,
    /// Per-barcode breakpoints computed by a job.
    Breakpoints,
}

impl Endpoint {
    #[must_use]
    pub fn template(self) -> &'static str {
        match self {
            Self::TestConnect => "/test-connect/",
            Self::RunValid => "/runs/{run_id}/",
            Self::TaskValid => "/tasks/{run_id}/",
            Self::Targets => "/targets/{run_id}/",
            Self::FlowcellTask => "/flowcells/{flowcell_id}/task/",
            Self::Breakpoints => "/breakpoints/{job_id}/",
        }
    }

    /// Fill `{name}` placeholders from `params` and prefix the swordfish base.
    pub fn resolve(self, params: &[(&str, &str)]) -> Result<String, SwordfishError> {
        let template = self.template();
        let mut path = String::with_capacity(SWORDFISH_BASE.len() + template.len());
        path.push_str(SWORDFISH_BASE);
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            path.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                SwordfishError::InvalidEndpoint(format!("unterminated placeholder in {template}").into())
            })?;
            let name = &after[..close];
            let value = params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    SwordfishError::InvalidEndpoint(
                        format!("{template}: missing parameter '{name}'").into(),
                    )
                })?;
            if value.is_empty() || value.contains('/') {
                return Err(SwordfishError::InvalidEndpoint(
                    format!("{template}: bad value '{value}' for '{name}'").into(),
                ));
            }
            path.push_str(value);
            rest = &after[close + 1..];
        }
        path.push_str(rest);
        Ok(path)
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{SWORDFISH_BASE}{}", self.template())
    }
}
