//! Plan command: show the upload chunk layout of a file.

use anyhow::{Context, Result};
use chunkup_core::chunking::{plan_chunks, ChunkSpec};
use chunkup_core::source::SourceFile;
use std::path::Path;

/// Print one line per chunk (index, byte range, length) and a summary.
pub async fn run_plan(path: &Path, chunk_size: u64) -> Result<()> {
    if chunk_size == 0 {
        anyhow::bail!("chunk size must be greater than 0");
    }
    let source = SourceFile::open(path).with_context(|| format!("open {}", path.display()))?;
    let chunks = plan_chunks(source.len(), chunk_size);
    println!(
        "{} ({} bytes, {}): {} chunk(s) of up to {} bytes",
        source.name(),
        source.len(),
        source.content_type(),
        chunks.len(),
        chunk_size
    );
    for line in plan_lines(&chunks) {
        println!("{}", line);
    }
    Ok(())
}

fn plan_lines(chunks: &[ChunkSpec]) -> Vec<String> {
    chunks
        .iter()
        .map(|c| format!("{:>5}  {:>12}..{:<12}  {:>10}", c.index, c.start, c.end, c.len()))
        .collect()
}
