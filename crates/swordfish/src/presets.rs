//! Operator behaviour presets.
//!
//! A preset file carries two tables, `[chunk_settings]` and
//! `[unblock_behaviour]`. Every field present is stamped onto each barcode
//! condition the merge engine touches; absent fields leave the condition as
//! the remote service (or the previous document) left it.

#![allow(missing_docs)]

use std::path::Path;

use serde::Deserialize;

use crate::document::{Action, Condition};
use crate::error::SwordfishError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkSettings {
    pub min_chunks: Option<u32>,
    pub max_chunks: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnblockBehaviour {
    pub single_on: Option<Action>,
    pub single_off: Option<Action>,
    pub multi_on: Option<Action>,
    pub multi_off: Option<Action>,
    pub no_seq: Option<Action>,
    pub no_map: Option<Action>,
}

/// Chunk and unblock overrides loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetBundle {
    #[serde(default)]
    pub chunk_settings: ChunkSettings,
    #[serde(default)]
    pub unblock_behaviour: UnblockBehaviour,
}

impl PresetBundle {
    pub fn parse(text: &str) -> Result<Self, SwordfishError> {
        let bundle: Self = toml::from_str(text)
            .map_err(|err| SwordfishError::InvalidConfig(format!("presets: {err}").into()))?;
        if let (Some(min), Some(max)) = (
            bundle.chunk_settings.min_chunks,
            bundle.chunk_settings.max_chunks,
        ) {
            if min > max {
                return Err(SwordfishError::InvalidConfig(
                    format!("presets: min_chunks {min} exceeds max_chunks {max}").into(),
                ));
            }
        }
        Ok(bundle)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SwordfishError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SwordfishError::MissingPresets(
                path.display().to_string().into(),
            ));
        }
        let text = std::fs::read_to_string(path).map_err(|err| {
            SwordfishError::InvalidConfig(format!("{}: {err}", path.display()).into())
        })?;
        Self::parse(&text)
    }

    /// Overwrite the condition's chunk and unblock fields with the preset values.
    pub fn stamp(&self, condition: &mut Condition) {
        let chunks = &self.chunk_settings;
        if let Some(min) = chunks.min_chunks {
            condition.min_chunks = min;
        }
        if let Some(max) = chunks.max_chunks {
            condition.max_chunks = max;
        }
        let behaviour = &self.unblock_behaviour;
        let slots = [
            (behaviour.single_on, &mut condition.single_on),
            (behaviour.single_off, &mut condition.single_off),
            (behaviour.multi_on, &mut condition.multi_on),
            (behaviour.multi_off, &mut condition.multi_off),
            (behaviour.no_seq, &mut condition.no_seq),
            (behaviour.no_map, &mut condition.no_map),
        ];
        for (preset, slot) in slots {
            if let Some(action) = preset {
                *slot = action;
            }
        }
    }
}
