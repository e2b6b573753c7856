//! Chunk planning.
//!
//! Splits a file of known length into fixed-size, index-ordered byte ranges.
//! The same planner drives both the upload fan-out and the sequential
//! checksum reads, each with its own chunk size.

mod range;

pub use range::{chunk_count, plan_chunks, ChunkSpec};

/// Bytes per uploaded chunk (5 MiB).
pub const UPLOAD_CHUNK_SIZE: u64 = 5 * 1024 * 1024;
