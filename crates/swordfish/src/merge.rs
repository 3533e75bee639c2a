//! Target merge engine.
//!
//! For every barcode in a fetched update: start from the barcode's condition
//! in the existing document (or derive one from `classified` for a new
//! barcode), apply the remote's advisory fields, union the targets, then
//! stamp the operator presets. Targets accrue and are never dropped; preset
//! fields always win over whatever the remote sent.

use std::collections::{BTreeMap, BTreeSet};

use crate::document::{Condition, ConfigDocument};
use crate::error::SwordfishError;
use crate::payload::ConditionUpdates;
use crate::presets::PresetBundle;

/// Merge `updates` into the barcode conditions of `existing`.
///
/// Returns only the barcodes named in `updates`. Fails on the first entry
/// that carries neither targets nor behaviour fields, and on any merged
/// condition whose chunk bounds no longer hold (`min_chunks > max_chunks`).
pub fn merge_targets(
    updates: &ConditionUpdates,
    existing: &ConfigDocument,
    presets: Option<&PresetBundle>,
) -> Result<BTreeMap<String, Condition>, SwordfishError> {
    let mut merged = BTreeMap::new();
    for (barcode, update) in updates {
        let update = update
            .as_ref()
            .filter(|update| !update.is_empty())
            .ok_or_else(|| SwordfishError::MalformedUpdate(barcode.as_str().into()))?;
        let prior = existing.conditions.barcodes.get(barcode);
        let mut condition = match prior {
            Some(condition) => condition.clone(),
            None => Condition::derived(barcode, &existing.conditions.classified),
        };
        update.apply_advisory(&mut condition);

        let mut targets: BTreeSet<String> = prior.map(Condition::target_set).unwrap_or_default();
        if let Some(fresh) = &update.targets {
            targets.extend(fresh.iter().cloned());
        }
        condition.targets = targets.into_iter().collect();

        if let Some(presets) = presets {
            presets.stamp(&mut condition);
        }
        condition.validate(barcode)?;
        merged.insert(barcode.clone(), condition);
    }
    Ok(merged)
}
