//! Durable storage for the [`RunState`] checkpoint document.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, SplitterError};
use crate::model::RunState;

/// Loads and saves the checkpoint file at a fixed path.
///
/// The store keeps no copy of the state between calls.
pub struct CheckpointStore {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Loads the checkpoint, creating and persisting an empty one on first run.
    pub fn load(&self) -> Result<RunState> {
        match self.read_existing()? {
            Some(mut state) => {
                state.log_info("Loaded progress data file.");
                Ok(state)
            }
            None => {
                let mut state = RunState::default();
                state.log_info("Created new progress data file.");
                self.save(&mut state)?;
                Ok(state)
            }
        }
    }

    /// Reads the checkpoint without creating it. `None` when the file is absent.
    pub fn read_existing(&self) -> Result<Option<RunState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&raw).map_err(|source| SplitterError::DataCorruption {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(state))
    }

    /// Stamps `last_run_time` and writes the whole document.
    ///
    /// The document goes to a sibling `.tmp` file first and is renamed over
    /// the checkpoint, so an interrupted write never truncates it.
    pub fn save(&self, state: &mut RunState) -> Result<()> {
        state.last_run_time = self.clock.now();
        let json = to_json(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &self.path)?;

        debug!(path = ?self.path, "Checkpoint saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn to_json(state: &RunState) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    state.serialize(&mut serializer)?;
    Ok(buf)
}
