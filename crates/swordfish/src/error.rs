//! Swordfish errors.

#![allow(missing_docs)]

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised by configuration loading, the remote client and the sync loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwordfishError {
    /// Invalid CLI or document configuration.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// The operator's configuration document does not exist.
    #[error("configuration document not found: {0}")]
    MissingDocument(SmolStr),

    /// The behaviour preset file does not exist.
    #[error("preset file not found: {0}")]
    MissingPresets(SmolStr),

    /// Local version is not accepted by the remote service.
    #[error("swordfish {local} is not compatible with this minoTour (accepts: {supported})")]
    IncompatibleVersion { local: SmolStr, supported: SmolStr },

    /// The remote service could not be reached or refused the handshake.
    #[error("minoTour unavailable: {0}")]
    ServiceUnavailable(SmolStr),

    /// The run identifier could not be resolved.
    #[error("could not resolve run: {0}")]
    RunContext(SmolStr),

    /// An endpoint template could not be filled in.
    #[error("invalid endpoint '{0}'")]
    InvalidEndpoint(SmolStr),

    /// Transport level failure (connection, TLS, timeout).
    #[error("transport error '{0}'")]
    Transport(SmolStr),

    /// The remote service returned an entry without targets or behaviour.
    #[error("malformed update for '{0}': no targets or behaviour fields")]
    MalformedUpdate(SmolStr),

    /// Reading or writing the live document failed.
    #[error("persist error '{0}'")]
    Persist(SmolStr),
}
