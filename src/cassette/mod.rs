//! Cassette format and on-disk storage.

pub mod format;
pub mod store;
