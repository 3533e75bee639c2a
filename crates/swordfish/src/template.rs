//! Initial configuration document rendering for the setup wizard.

#![allow(missing_docs)]

use std::collections::BTreeMap;

use crate::document::{Action, Condition, ConfigDocument, Conditions};
use crate::error::SwordfishError;

pub const DEFAULT_BASECALLER_CONFIG: &str = "dna_r9.4.1_450bps_fast";

/// Answers collected by the setup wizard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTemplate {
    /// Deplete the listed barcodes (otherwise enrich them).
    pub deplete: bool,
    pub basecaller_host: String,
    pub basecaller_port: u16,
    pub accept_multi_maps: bool,
    /// Two-digit barcode numbers, e.g. `"07"`.
    pub barcodes: Vec<String>,
    pub barcode_kit: String,
    pub reference: String,
}

/// Parse `"01,02,19"` (a trailing comma is allowed) into barcode numbers.
pub fn parse_barcodes(text: &str) -> Result<Vec<String>, SwordfishError> {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    let mut barcodes: Vec<String> = Vec::new();
    for part in trimmed.split(',') {
        if part.len() != 2 || !part.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(SwordfishError::InvalidConfig(
                format!("invalid barcode '{part}': expected two digits, comma separated, no spaces")
                    .into(),
            ));
        }
        if !barcodes.iter().any(|seen| seen == part) {
            barcodes.push(part.to_string());
        }
    }
    Ok(barcodes)
}

fn condition(name: &str, max_chunks: u32, actions: [Action; 4]) -> Condition {
    let [single_on, single_off, multi_on, multi_off] = actions;
    Condition {
        name: name.to_string(),
        control: false,
        min_chunks: 0,
        max_chunks,
        targets: Vec::new(),
        single_on,
        single_off,
        multi_on,
        multi_off,
        no_seq: Action::Proceed,
        no_map: Action::Proceed,
        extra: toml::Table::new(),
    }
}

#[must_use]
pub fn render_document(template: &DocumentTemplate) -> ConfigDocument {
    let on_target = if template.deplete {
        Action::Unblock
    } else {
        Action::StopReceiving
    };
    let multi_on = if template.deplete || !template.accept_multi_maps {
        Action::Unblock
    } else {
        Action::StopReceiving
    };

    let barcodes: BTreeMap<String, Condition> = template
        .barcodes
        .iter()
        .map(|number| {
            let name = format!("barcode{number}");
            let condition = condition(
                &name,
                4,
                [on_target, Action::StopReceiving, multi_on, Action::StopReceiving],
            );
            (name, condition)
        })
        .collect();

    let mut caller_settings = toml::Table::new();
    caller_settings.insert(
        "config_name".into(),
        toml::Value::String(DEFAULT_BASECALLER_CONFIG.to_string()),
    );
    caller_settings.insert(
        "host".into(),
        toml::Value::String(template.basecaller_host.clone()),
    );
    caller_settings.insert(
        "port".into(),
        toml::Value::Integer(i64::from(template.basecaller_port)),
    );
    caller_settings.insert(
        "barcode_kits".into(),
        toml::Value::Array(vec![toml::Value::String(template.barcode_kit.clone())]),
    );

    ConfigDocument {
        caller_settings,
        conditions: Conditions {
            reference: Some(template.reference.clone()),
            classified: condition("classified", 2, [on_target; 4]),
            unclassified: condition("unclassified_reads", 2, [Action::Unblock; 4]),
            barcodes,
        },
        extra: toml::Table::new(),
    }
}
