//! Deterministic record/replay for external API calls in agent end-to-end
//! tests.
//!
//! A suite runs once against the real service in record mode: every
//! intercepted call/response pair is captured, scrubbed of secrets, and
//! persisted as a named cassette. From then on mock mode serves those exact
//! responses in recorded order with no network access, so the tests run
//! offline and bit-identically.
//!
//! The moving parts, leaf to root:
//! - [`scrub`] removes credential-shaped content before anything hits disk.
//! - [`serialize`] converts opaque responses and call arguments to a tagged,
//!   storable form and rebuilds them on replay.
//! - [`cassette`] owns the on-disk format: one ordered JSON call log per
//!   scenario.
//! - [`intercept`] installs and removes the call intercepts for the lifetime
//!   of a scoped [`Session`](intercept::Session).

pub mod cassette;
pub mod error;
pub mod intercept;
pub mod mode;
pub mod scrub;
pub mod serialize;

pub use cassette::format::{ApiKind, CallRecord, SerializedArgs, SerializedResponse};
pub use cassette::store::CassetteStore;
pub use error::HarnessError;
pub use intercept::{CallError, CallHandler, CallResult, Harness, InterceptRegistry, Session};
pub use mode::{select_mode, Mode, ModeSelection};
pub use scrub::{scrub, scrub_records, REDACTED};
pub use serialize::{
    deserialize_response, serialize_args, serialize_response, CallArgs, CallValue, Response,
    ShapeRegistry, StructuredDump, RAW_TAG,
};
