//! Document log implementation.
//!
//! Event documents are stored in an append-only log of checksummed frames.
//! The log is replayed in full on open; ordering is applied in memory.

mod log;

pub use log::DocumentLog;
