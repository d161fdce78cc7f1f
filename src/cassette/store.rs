//! On-disk cassette storage: one JSON document per scenario.

use std::fs;
use std::path::{Path, PathBuf};

use crate::cassette::format::CallRecord;
use crate::error::HarnessError;

/// Name of the call log file inside each scenario directory.
const CASSETTE_FILE: &str = "calls.json";

/// Loads and saves ordered call logs under a fixed root directory.
///
/// The store never scrubs — scrubbing is performed exactly once by the
/// session, before `save`.
#[derive(Debug, Clone)]
pub struct CassetteStore {
    root: PathBuf,
}

impl CassetteStore {
    /// Creates a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory holding all scenario cassettes.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Deterministic location of a scenario's cassette file.
    #[must_use]
    pub fn path_for(&self, scenario: &str) -> PathBuf {
        self.root.join(scenario).join(CASSETTE_FILE)
    }

    /// Whether a cassette has been recorded for the scenario.
    #[must_use]
    pub fn exists(&self, scenario: &str) -> bool {
        self.path_for(scenario).is_file()
    }

    /// Loads the ordered call log for a scenario.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::CassetteNotFound`] when no cassette exists —
    /// the signal that the scenario must be recorded first —
    /// [`HarnessError::Io`] when the file cannot be read, and
    /// [`HarnessError::Malformed`] when it does not parse as a record array.
    pub fn load(&self, scenario: &str) -> Result<Vec<CallRecord>, HarnessError> {
        let path = self.path_for(scenario);
        if !path.is_file() {
            return Err(HarnessError::CassetteNotFound { scenario: scenario.to_string(), path });
        }
        let content = fs::read_to_string(&path)
            .map_err(|source| HarnessError::Io { scenario: scenario.to_string(), source })?;
        serde_json::from_str(&content)
            .map_err(|source| HarnessError::Malformed { scenario: scenario.to_string(), source })
    }

    /// Ensures the scenario's cassette directory exists.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Io`] when the directory cannot be created.
    pub fn ensure_dir(&self, scenario: &str) -> Result<(), HarnessError> {
        fs::create_dir_all(self.root.join(scenario))
            .map_err(|source| HarnessError::Io { scenario: scenario.to_string(), source })
    }

    /// Saves the full ordered call log as one pretty-printed JSON document,
    /// overwriting any prior cassette for the scenario.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Io`] when the directory or file cannot be
    /// written.
    pub fn save(&self, scenario: &str, records: &[CallRecord]) -> Result<PathBuf, HarnessError> {
        let path = self.path_for(scenario);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|source| HarnessError::Io { scenario: scenario.to_string(), source })?;
        }
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| HarnessError::Io {
                scenario: scenario.to_string(),
                source: std::io::Error::other(e),
            })?;
        fs::write(&path, json)
            .map_err(|source| HarnessError::Io { scenario: scenario.to_string(), source })?;
        Ok(path)
    }
}
