//! Whole-file MD5 digest.
//!
//! Reads the file in sequential `chunk_size` ranges, each read finishing
//! before the next starts, and feeds them to one incremental hasher. The
//! digest depends only on the bytes, never on the step size.

use md5::{Digest, Md5};
use std::io::{self, Read};

use crate::chunking::plan_chunks;
use crate::source::SourceFile;

/// Bytes read per step while hashing (2 MiB), independent of the upload chunk size.
pub const CHECKSUM_CHUNK_SIZE: u64 = 2 * 1024 * 1024;

/// MD5 of the whole source file as lowercase hex. Fails on the first range read error.
pub fn md5_source(file: &SourceFile, chunk_size: u64) -> io::Result<String> {
    if chunk_size == 0 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "checksum chunk size must be greater than 0",
        ));
    }
    let mut hasher = Md5::new();
    for range in plan_chunks(file.len(), chunk_size) {
        let bytes = file.read_range(range.start, range.end)?;
        hasher.update(&bytes);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// MD5 of everything `reader` yields, reading `buf_size` bytes at a time.
pub fn md5_reader<R: Read>(mut reader: R, buf_size: usize) -> io::Result<String> {
    let mut hasher = Md5::new();
    let mut buf = vec![0u8; buf_size.max(1)];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
