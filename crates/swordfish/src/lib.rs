//! `swordfish` - keeps a readfish live configuration in step with minoTour.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]

/// HTTP client for the minoTour swordfish API.
pub mod client;
/// Sleep/clock abstraction for polling and backoff.
pub mod clock;
/// Run identifier resolution.
pub mod context;
/// readfish configuration document model.
pub mod document;
/// minoTour endpoint templates.
pub mod endpoints;
/// Errors shared across the crate.
pub mod error;
/// Version handshake with the remote service.
pub mod gate;
/// Target merge engine.
pub mod merge;
/// Remote payload shapes per experiment mode.
pub mod payload;
/// Operator behaviour presets.
pub mod presets;
/// Validated service and sync settings.
pub mod settings;
/// Original/live document persistence.
pub mod store;
/// Live configuration synchronization loop.
pub mod sync;
/// Initial document rendering for the setup wizard.
pub mod template;

pub use error::SwordfishError;

/// Version of this tool, sent to and checked against the remote service.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
