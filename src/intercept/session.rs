//! Scoped record/replay sessions over intercepted call targets.
//!
//! A session moves through idle → active → stopped. Starting installs an
//! intercepting handler on every bound target; dropping the session restores
//! the originals unconditionally, whether or not the test body succeeded.
//! Only an explicit [`Session::stop`] on the success path persists a
//! recording, so a failed record run never creates or clobbers a cassette.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::cassette::format::{ApiKind, CallRecord};
use crate::cassette::store::CassetteStore;
use crate::error::HarnessError;
use crate::intercept::registry::{CallHandler, CallResult, InterceptRegistry};
use crate::mode::Mode;
use crate::scrub;
use crate::serialize::{self, CallArgs, ShapeRegistry};

/// Bundles the cassette store, intercept registry, and shape registry, and
/// starts record/replay sessions against them.
pub struct Harness {
    store: CassetteStore,
    registry: Arc<InterceptRegistry>,
    shapes: Arc<ShapeRegistry>,
}

impl Harness {
    /// Creates a harness storing cassettes under the given root.
    pub fn new(
        cassette_root: impl Into<PathBuf>,
        registry: Arc<InterceptRegistry>,
        shapes: ShapeRegistry,
    ) -> Self {
        Self { store: CassetteStore::new(cassette_root), registry, shapes: Arc::new(shapes) }
    }

    /// The registry whose targets sessions intercept.
    #[must_use]
    pub fn registry(&self) -> &Arc<InterceptRegistry> {
        &self.registry
    }

    /// The store resolving cassette paths.
    #[must_use]
    pub fn store(&self) -> &CassetteStore {
        &self.store
    }

    /// Starts a session for a scenario, installing intercepts on every bound
    /// target.
    ///
    /// # Errors
    ///
    /// In [`Mode::Mock`], fails with [`HarnessError::CassetteNotFound`] when
    /// the scenario has no recorded cassette; no intercept is installed in
    /// that case. In [`Mode::Record`], fails when the cassette directory
    /// cannot be created.
    pub fn start(&self, scenario: &str, mode: Mode) -> Result<Session, HarnessError> {
        Session::start(
            scenario,
            mode,
            self.store.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.shapes),
        )
    }
}

/// Shared state the intercepting handlers write into.
struct SessionState {
    scenario: String,
    shapes: Arc<ShapeRegistry>,
    /// Accumulated records (record mode) or the loaded cassette (mock mode).
    records: Vec<CallRecord>,
    /// Position of the next record to serve during replay. Owned exclusively
    /// by this session; never decremented.
    cursor: usize,
}

/// An active record/replay session for one scenario.
///
/// One session is active at a time per registry; callers run sessions
/// sequentially, one per test.
pub struct Session {
    scenario: String,
    mode: Mode,
    store: CassetteStore,
    registry: Arc<InterceptRegistry>,
    state: Arc<Mutex<SessionState>>,
    /// Originals to put back, in install order.
    installed: Vec<(String, CallHandler)>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("scenario", &self.scenario)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Session {
    fn start(
        scenario: &str,
        mode: Mode,
        store: CassetteStore,
        registry: Arc<InterceptRegistry>,
        shapes: Arc<ShapeRegistry>,
    ) -> Result<Self, HarnessError> {
        // The cassette must be confirmed present before any intercept goes in.
        let records = match mode {
            Mode::Mock => store.load(scenario)?,
            Mode::Record => {
                store.ensure_dir(scenario)?;
                Vec::new()
            }
        };
        tracing::debug!(scenario, ?mode, loaded = records.len(), "session starting");

        let state = Arc::new(Mutex::new(SessionState {
            scenario: scenario.to_string(),
            shapes,
            records,
            cursor: 0,
        }));

        let mut installed = Vec::new();
        for (target, api) in registry.targets() {
            let original = registry.handler(&target);
            let replacement = intercepting_handler(mode, api, &state, &original);
            registry.install(&target, replacement);
            installed.push((target, original));
        }

        Ok(Self {
            scenario: scenario.to_string(),
            mode,
            store,
            registry,
            state,
            installed,
        })
    }

    /// Scenario name, fixed at start.
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Session mode, fixed at start.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Snapshot of the call records accumulated (record) or loaded (mock) so
    /// far, for post-hoc assertions.
    #[must_use]
    pub fn calls(&self) -> Vec<CallRecord> {
        self.state.lock().expect("session lock poisoned").records.clone()
    }

    /// Stops the session: restores every original binding, then — record
    /// mode only — scrubs the full call log once and persists it,
    /// overwriting any prior cassette for the scenario.
    ///
    /// Call this on the success path only. On failure, drop the session
    /// instead: intercepts are still removed, but nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error when the cassette cannot be serialized or written.
    pub fn stop(mut self) -> Result<(), HarnessError> {
        self.remove_intercepts();
        if self.mode == Mode::Record {
            let records = {
                let guard = self.state.lock().expect("session lock poisoned");
                scrub::scrub_records(&guard.records).map_err(|source| HarnessError::Malformed {
                    scenario: self.scenario.clone(),
                    source,
                })?
            };
            let path = self.store.save(&self.scenario, &records)?;
            tracing::debug!(
                scenario = %self.scenario,
                records = records.len(),
                path = %path.display(),
                "cassette saved"
            );
        }
        Ok(())
    }

    fn remove_intercepts(&mut self) {
        for (target, original) in self.installed.drain(..) {
            self.registry.restore(&target, original);
        }
        tracing::debug!(scenario = %self.scenario, "intercepts removed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Runs on the failure path too: intercepts never outlive the
        // session, and no cassette is written here.
        self.remove_intercepts();
    }
}

/// Builds the mode-specific replacement handler for one target.
fn intercepting_handler(
    mode: Mode,
    api: ApiKind,
    state: &Arc<Mutex<SessionState>>,
    original: &CallHandler,
) -> CallHandler {
    let state = Arc::clone(state);
    let original = Arc::clone(original);
    Arc::new(move |args: &CallArgs| match mode {
        Mode::Record => record_call(api, &state, &original, args),
        Mode::Mock => replay_call(api, &state),
    })
}

/// Record mode: forward to the real function, append the pair, return the
/// real response unchanged. An erroring real call propagates unrecorded.
fn record_call(
    api: ApiKind,
    state: &Mutex<SessionState>,
    original: &CallHandler,
    args: &CallArgs,
) -> CallResult {
    let response = original(args)?;
    let record = CallRecord {
        api,
        request: serialize::serialize_args(args),
        response: serialize::serialize_response(&response),
    };
    let mut guard = state.lock().expect("session lock poisoned");
    tracing::debug!(api = api.as_str(), seq = guard.records.len(), "call recorded");
    guard.records.push(record);
    Ok(response)
}

/// Mock mode: serve the next stored response and advance the cursor. No real
/// call is ever issued.
fn replay_call(api: ApiKind, state: &Mutex<SessionState>) -> CallResult {
    let (entry, shapes) = {
        let mut guard = state.lock().expect("session lock poisoned");
        if guard.cursor >= guard.records.len() {
            return Err(Box::new(HarnessError::CassetteExhausted {
                scenario: guard.scenario.clone(),
                recorded: guard.records.len(),
                attempted: guard.cursor + 1,
            }));
        }
        let entry = guard.records[guard.cursor].response.clone();
        tracing::debug!(api = api.as_str(), seq = guard.cursor, "call replayed");
        guard.cursor += 1;
        (entry, Arc::clone(&guard.shapes))
    };
    Ok(serialize::deserialize_response(&shapes, &entry))
}
