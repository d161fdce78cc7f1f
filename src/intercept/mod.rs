//! Interception controller: named call bindings and scoped sessions.

pub mod registry;
pub mod session;

pub use registry::{CallError, CallHandler, CallResult, InterceptRegistry};
pub use session::{Harness, Session};
