#![forbid(unsafe_code)]

//! Shared test support: scripted in-memory collaborators with call counters
//! and gates, plus on-disk manifest/segment fixture writers.
//!
//! Nothing here is production code; the scripted build engine applies its
//! flags (in-flight, failure, invalidation) to every cache key, which is all
//! the single-asset test scenarios need.

mod fixtures;
mod scripted;
mod stores;

pub use fixtures::{
    test_session, write_chunks, write_init_segment, write_manifest, write_ready_asset,
};
pub use scripted::ScriptedBuildEngine;
pub use stores::{CountingEvictionTracker, MemorySessionStore, MemoryTrackStore};
