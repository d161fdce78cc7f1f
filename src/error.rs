//! Structured errors for the record/replay harness.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the cassette store and interception sessions.
///
/// Every variant names the failing scenario so a test failure points straight
/// at the cassette involved. Deserialization fallback is deliberately *not*
/// represented here: an unknown or unreconstructible response shape degrades
/// to raw stored data instead of failing the call.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Mock mode was requested but no cassette has been recorded yet.
    #[error("no cassette for scenario {scenario:?} at {path}; run in record mode first")]
    CassetteNotFound {
        /// Scenario the session was started for.
        scenario: String,
        /// Where the cassette file was expected.
        path: PathBuf,
    },

    /// A mock session issued more calls than the cassette holds.
    ///
    /// This almost always means the code under test changed behavior, not
    /// that the harness broke; re-record the scenario after reviewing.
    #[error(
        "cassette exhausted for scenario {scenario:?}: expected at most \
         {recorded} calls, but got call #{attempted}"
    )]
    CassetteExhausted {
        /// Scenario whose cassette ran out.
        scenario: String,
        /// Number of calls the cassette holds.
        recorded: usize,
        /// One-based index of the call that could not be served.
        attempted: usize,
    },

    /// Reading or writing a cassette file failed.
    #[error("cassette I/O failed for scenario {scenario:?}: {source}")]
    Io {
        /// Scenario whose cassette was being accessed.
        scenario: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A cassette exists but does not parse as an ordered call record array.
    #[error("malformed cassette for scenario {scenario:?}: {source}")]
    Malformed {
        /// Scenario whose cassette failed to parse.
        scenario: String,
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },
}
