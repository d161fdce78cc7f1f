//! Cassette data structures: one ordered call log per scenario.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which intercepted entry point produced a record.
///
/// Informational only — replay matching is purely positional, never keyed on
/// the entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKind {
    /// The synchronous completion-style call.
    Completion,
    /// The streaming responses-style call.
    Responses,
}

impl ApiKind {
    /// Wire name of this entry point, as written in the cassette file.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ApiKind::Completion => "completion",
            ApiKind::Responses => "responses",
        }
    }
}

/// Storable form of one call's arguments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SerializedArgs {
    /// Positional arguments, in call order, scrubbed-safe.
    pub args: Vec<Value>,
    /// Named arguments, scrubbed-safe.
    pub kwargs: Map<String, Value>,
}

/// Storable, tagged form of one call's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedResponse {
    /// Tag identifying the original response's concrete shape, or `"raw"`.
    #[serde(rename = "_type")]
    pub type_tag: String,
    /// Plain-data payload used to rebuild the response on replay.
    pub data: Value,
}

/// One intercepted call's request and response. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Entry point that produced this record.
    pub api: ApiKind,
    /// Serialized call arguments.
    pub request: SerializedArgs,
    /// Serialized response.
    pub response: SerializedResponse,
}
