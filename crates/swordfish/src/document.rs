//! readfish configuration document model.
//!
//! The document is the TOML file readfish reads: an opaque `[caller_settings]`
//! table and a `[conditions]` table holding the reserved `classified` and
//! `unclassified` conditions plus one condition per barcode. Keys this tool
//! does not understand are carried through untouched.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SwordfishError;

pub const CLASSIFIED: &str = "classified";
pub const UNCLASSIFIED: &str = "unclassified";

/// What readfish does with a read once a decision is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Unblock,
    StopReceiving,
    Proceed,
}

/// One barcode (or the classified/unclassified bucket).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    #[serde(default)]
    pub control: bool,
    pub min_chunks: u32,
    pub max_chunks: u32,
    #[serde(default)]
    pub targets: Vec<String>,
    pub single_on: Action,
    pub single_off: Action,
    pub multi_on: Action,
    pub multi_off: Action,
    pub no_seq: Action,
    pub no_map: Action,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl Condition {
    /// Condition for a barcode first reported by the remote service.
    ///
    /// Chunk bounds and actions are inherited from `template` (normally the
    /// `classified` condition, which encodes deplete vs enrich); targets start
    /// empty.
    #[must_use]
    pub fn derived(barcode: &str, template: &Condition) -> Self {
        Self {
            name: barcode.to_string(),
            control: false,
            min_chunks: template.min_chunks,
            max_chunks: template.max_chunks,
            targets: Vec::new(),
            single_on: template.single_on,
            single_off: template.single_off,
            multi_on: template.multi_on,
            multi_off: template.multi_off,
            no_seq: template.no_seq,
            no_map: template.no_map,
            extra: toml::Table::new(),
        }
    }

    /// Targets as a deduplicated, sorted set.
    #[must_use]
    pub fn target_set(&self) -> BTreeSet<String> {
        self.targets.iter().cloned().collect()
    }

    pub(crate) fn validate(&self, key: &str) -> Result<(), SwordfishError> {
        if self.min_chunks > self.max_chunks {
            return Err(SwordfishError::InvalidConfig(
                format!(
                    "conditions.{key}: min_chunks {} exceeds max_chunks {}",
                    self.min_chunks, self.max_chunks
                )
                .into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub classified: Condition,
    pub unclassified: Condition,
    #[serde(flatten)]
    pub barcodes: BTreeMap<String, Condition>,
}

/// The whole configuration document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub caller_settings: toml::Table,
    pub conditions: Conditions,
    #[serde(flatten)]
    pub extra: toml::Table,
}

impl ConfigDocument {
    pub fn parse(text: &str) -> Result<Self, SwordfishError> {
        let document: Self = toml::from_str(text)
            .map_err(|err| SwordfishError::InvalidConfig(format!("{err}").into()))?;
        document.validate()?;
        Ok(document)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SwordfishError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SwordfishError::MissingDocument(
                path.display().to_string().into(),
            ));
        }
        let text = std::fs::read_to_string(path).map_err(|err| {
            SwordfishError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        Self::parse(&text).map_err(|err| match err {
            SwordfishError::InvalidConfig(message) => SwordfishError::InvalidConfig(
                format!("{}: {message}", path.display()).into(),
            ),
            other => other,
        })
    }

    pub fn to_toml_string(&self) -> Result<String, SwordfishError> {
        toml::to_string_pretty(self)
            .map_err(|err| SwordfishError::Persist(format!("serialize document: {err}").into()))
    }

    fn validate(&self) -> Result<(), SwordfishError> {
        self.conditions.classified.validate(CLASSIFIED)?;
        self.conditions.unclassified.validate(UNCLASSIFIED)?;
        for (key, condition) in &self.conditions.barcodes {
            condition.validate(key)?;
        }
        Ok(())
    }

    /// Build the next live document.
    ///
    /// `self` is the operator's original document and supplies every section
    /// except barcode conditions. Barcodes come from the original, then the
    /// previous live document (which holds the accrued targets), then
    /// `merged`, later layers replacing earlier ones per barcode.
    #[must_use]
    pub fn next_live(
        &self,
        previous: &ConfigDocument,
        merged: BTreeMap<String, Condition>,
    ) -> ConfigDocument {
        let mut next = self.clone();
        for (barcode, condition) in &previous.conditions.barcodes {
            next.conditions
                .barcodes
                .insert(barcode.clone(), condition.clone());
        }
        next.conditions.barcodes.extend(merged);
        next
    }
}
