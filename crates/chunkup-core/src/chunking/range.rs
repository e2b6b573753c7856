//! Chunk type and range planning.

/// One chunk of the source file: 0-based `index` and byte range [start, end) (half-open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: usize,
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl ChunkSpec {
    /// Length of this chunk in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of chunks for `total_size` bytes: `ceil(total_size / chunk_size)`.
pub fn chunk_count(total_size: u64, chunk_size: u64) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    total_size.div_ceil(chunk_size) as usize
}

/// Builds the chunk plan for a given total size and chunk size.
///
/// Every chunk is `chunk_size` bytes except possibly the last, which holds the
/// remainder. Returns an empty vec if `total_size` or `chunk_size` is 0.
pub fn plan_chunks(total_size: u64, chunk_size: u64) -> Vec<ChunkSpec> {
    let count = chunk_count(total_size, chunk_size);
    let mut out = Vec::with_capacity(count);
    let mut offset = 0u64;
    for index in 0..count {
        let end = offset.saturating_add(chunk_size).min(total_size);
        out.push(ChunkSpec {
            index,
            start: offset,
            end,
        });
        offset = end;
    }
    out
}
