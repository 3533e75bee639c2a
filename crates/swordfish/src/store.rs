//! Original and live document persistence.
//!
//! The original document is operator intent and is only ever read. The live
//! document sits next to it with `_live` appended to the file name and is
//! replaced atomically: bytes go to `<live>.part`, then a rename swaps it in,
//! so readfish never observes a half-written file.

#![allow(missing_docs)]

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::document::ConfigDocument;
use crate::error::SwordfishError;

pub const LIVE_SUFFIX: &str = "_live";
const PART_SUFFIX: &str = ".part";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The live file already held identical bytes.
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct ConfigStore {
    original: PathBuf,
    live: PathBuf,
}

impl ConfigStore {
    #[must_use]
    pub fn new(original: impl Into<PathBuf>) -> Self {
        let original = original.into();
        let live = live_path_for(&original);
        Self { original, live }
    }

    #[must_use]
    pub fn original_path(&self) -> &Path {
        &self.original
    }

    #[must_use]
    pub fn live_path(&self) -> &Path {
        &self.live
    }

    pub fn load_original(&self) -> Result<ConfigDocument, SwordfishError> {
        ConfigDocument::load(&self.original)
    }

    /// `Ok(None)` when no live document has been written yet.
    pub fn load_live(&self) -> Result<Option<ConfigDocument>, SwordfishError> {
        if !self.live.exists() {
            return Ok(None);
        }
        ConfigDocument::load(&self.live).map(Some)
    }

    /// Create the live document from `original` unless one already exists.
    pub fn seed_live(&self, original: &ConfigDocument) -> Result<WriteOutcome, SwordfishError> {
        if self.live.exists() {
            return Ok(WriteOutcome::Unchanged);
        }
        self.write_live(original)
    }

    pub fn write_live(&self, document: &ConfigDocument) -> Result<WriteOutcome, SwordfishError> {
        let text = document.to_toml_string()?;
        if let Ok(current) = fs::read(&self.live) {
            if current == text.as_bytes() {
                debug!(path = %self.live.display(), "live document unchanged");
                return Ok(WriteOutcome::Unchanged);
            }
        }
        write_atomic(&self.live, text.as_bytes())?;
        Ok(WriteOutcome::Written)
    }
}

/// `exp.toml` becomes `exp.toml_live`.
#[must_use]
pub fn live_path_for(original: &Path) -> PathBuf {
    let mut live: OsString = original.as_os_str().to_os_string();
    live.push(LIVE_SUFFIX);
    PathBuf::from(live)
}

fn write_atomic(destination: &Path, bytes: &[u8]) -> Result<(), SwordfishError> {
    let mut part: OsString = destination.as_os_str().to_os_string();
    part.push(PART_SUFFIX);
    let part = PathBuf::from(part);

    let result = (|| {
        let mut writer = BufWriter::new(File::create(&part)?);
        writer.write_all(bytes)?;
        let file = writer.into_inner().map_err(std::io::IntoInnerError::into_error)?;
        file.sync_all()?;
        fs::rename(&part, destination)
    })();
    if let Err(err) = result {
        let _ = fs::remove_file(&part);
        return Err(SwordfishError::Persist(
            format!("{}: {err}", destination.display()).into(),
        ));
    }
    Ok(())
}
