//! Named intercept bindings over the collaborator's call-issuing functions.

use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

use crate::cassette::format::ApiKind;
use crate::serialize::{CallArgs, Response};

/// Error type produced by a call-issuing function.
pub type CallError = Box<dyn Error + Send + Sync>;

/// Result of one dispatched call.
pub type CallResult = Result<Response, CallError>;

/// A call-issuing function, treated as `(args) -> response`.
pub type CallHandler = Arc<dyn Fn(&CallArgs) -> CallResult + Send + Sync>;

struct Binding {
    api: ApiKind,
    handler: CallHandler,
}

/// Registry of `(target, handler)` bindings for the entry points a session
/// intercepts.
///
/// The collaborator routes its calls through [`InterceptRegistry::dispatch`];
/// an active session swaps handlers in and out for its lifetime. Several
/// target names may share one [`ApiKind`] when distinct call sites delegate
/// to the same logical operation — whichever alias fires, exactly one record
/// is produced per logical call.
///
/// The registry carries no process-global state of its own; suites that need
/// one shared seam hold a single `Arc<InterceptRegistry>`.
#[derive(Default)]
pub struct InterceptRegistry {
    bindings: Mutex<HashMap<String, Binding>>,
}

impl InterceptRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a real call-issuing entry point under a target name.
    pub fn bind(&self, target: impl Into<String>, api: ApiKind, handler: CallHandler) {
        let mut bindings = self.bindings.lock().expect("binding lock poisoned");
        bindings.insert(target.into(), Binding { api, handler });
    }

    /// Invokes the current handler for a target.
    ///
    /// # Errors
    ///
    /// Propagates whatever the bound handler returns.
    ///
    /// # Panics
    ///
    /// Panics when the target was never bound. Calling through an unbound
    /// target is wiring corruption, not test logic, and is allowed to be
    /// process-fatal.
    pub fn dispatch(&self, target: &str, args: &CallArgs) -> CallResult {
        let handler = {
            let bindings = self.bindings.lock().expect("binding lock poisoned");
            let binding = bindings
                .get(target)
                .unwrap_or_else(|| panic!("no call target bound as {target:?}"));
            Arc::clone(&binding.handler)
        };
        handler(args)
    }

    /// Names and logical operations of every bound target.
    #[must_use]
    pub fn targets(&self) -> Vec<(String, ApiKind)> {
        let bindings = self.bindings.lock().expect("binding lock poisoned");
        bindings.iter().map(|(name, binding)| (name.clone(), binding.api)).collect()
    }

    /// Current handler for a target, cloned.
    pub(crate) fn handler(&self, target: &str) -> CallHandler {
        let bindings = self.bindings.lock().expect("binding lock poisoned");
        let binding =
            bindings.get(target).unwrap_or_else(|| panic!("no call target bound as {target:?}"));
        Arc::clone(&binding.handler)
    }

    /// Swaps in a replacement handler, returning the one it displaced.
    pub(crate) fn install(&self, target: &str, replacement: CallHandler) -> CallHandler {
        let mut bindings = self.bindings.lock().expect("binding lock poisoned");
        let binding = bindings
            .get_mut(target)
            .unwrap_or_else(|| panic!("no call target bound as {target:?}"));
        std::mem::replace(&mut binding.handler, replacement)
    }

    /// Puts an original handler back after a session ends.
    pub(crate) fn restore(&self, target: &str, original: CallHandler) {
        let mut bindings = self.bindings.lock().expect("binding lock poisoned");
        let binding = bindings
            .get_mut(target)
            .unwrap_or_else(|| panic!("no call target bound as {target:?}"));
        binding.handler = original;
    }
}
