//! One-shot version handshake with minoTour.

use tracing::info;

use crate::client::StatusClient;
use crate::endpoints::Endpoint;
use crate::error::SwordfishError;

/// Response header listing the swordfish versions a minoTour accepts.
pub const COMPATIBLE_VERSIONS_HEADER: &str = "x-swordfish-compatible";

/// Parse the header: a JSON array of versions or a comma separated list.
#[must_use]
pub fn parse_compatible_versions(value: &str) -> Vec<String> {
    let value = value.trim();
    if value.starts_with('[') {
        if let Ok(versions) = serde_json::from_str::<Vec<String>>(value) {
            return versions
                .into_iter()
                .map(|version| version.trim().to_string())
                .filter(|version| !version.is_empty())
                .collect();
        }
    }
    value
        .trim_matches(|ch| ch == '[' || ch == ']')
        .split(',')
        .map(|version| version.trim().trim_matches('"').trim().to_string())
        .filter(|version| !version.is_empty())
        .collect()
}

/// Check that minoTour is reachable and accepts `local_version`.
///
/// Any failure is fatal for the caller: without a compatible service there
/// is nothing to synchronize against.
pub fn validate_connection(client: &StatusClient, local_version: &str) -> Result<(), SwordfishError> {
    let response = client
        .get(
            Endpoint::TestConnect,
            &[],
            &[("version", local_version)],
        )
        .map_err(|err| match err {
            SwordfishError::Transport(message) => SwordfishError::ServiceUnavailable(
                format!("{}: {message}", client.base_url()).into(),
            ),
            other => other,
        })?;
    if !response.is_success() {
        return Err(SwordfishError::ServiceUnavailable(
            format!(
                "{} answered the connection test with status {}",
                client.base_url(),
                response.status
            )
            .into(),
        ));
    }
    let header = response.header(COMPATIBLE_VERSIONS_HEADER).ok_or_else(|| {
        SwordfishError::ServiceUnavailable(
            format!("connection test response lacks the {COMPATIBLE_VERSIONS_HEADER} header").into(),
        )
    })?;
    let supported = parse_compatible_versions(header);
    if !supported.iter().any(|version| version == local_version.trim()) {
        return Err(SwordfishError::IncompatibleVersion {
            local: local_version.into(),
            supported: supported.join(", ").into(),
        });
    }
    info!(version = local_version, "minoTour accepts this swordfish version");
    Ok(())
}
