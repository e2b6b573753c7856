//! Checksum command: MD5 of a file, computed the way the uploader does.

use anyhow::{Context, Result};
use chunkup_core::checksum;
use chunkup_core::source::SourceFile;
use std::path::Path;

/// Compute and print the MD5 digest of the given file.
pub async fn run_checksum(path: &Path, chunk_size: u64) -> Result<()> {
    let source = SourceFile::open(path).with_context(|| format!("open {}", path.display()))?;
    let digest = checksum::md5_source(&source, chunk_size)
        .with_context(|| format!("read {}", path.display()))?;
    println!("{}  {}", digest, path.display());
    Ok(())
}
