//! Streaming `multipart/form-data` body for one chunk upload.
//!
//! The `index` and `chunkSize` fields are small and held in memory; the
//! `chunkFile` part is read from the source file on demand, so a transfer
//! only ever holds what curl asks for in one read callback.

use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::chunking::ChunkSpec;
use crate::source::SourceFile;

static BOUNDARY_SEQ: AtomicU64 = AtomicU64::new(0);

fn new_boundary() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let seq = BOUNDARY_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("------------------------chunkup{:x}{:04x}", nanos, seq)
}

pub(crate) struct ChunkBody<'a> {
    file: &'a SourceFile,
    chunk: ChunkSpec,
    boundary: String,
    head: Vec<u8>,
    tail: Vec<u8>,
    /// Bytes of the whole body already handed out.
    pos: u64,
}

impl<'a> ChunkBody<'a> {
    pub(crate) fn new(file: &'a SourceFile, chunk: &ChunkSpec) -> Self {
        Self::with_boundary(file, chunk, new_boundary())
    }

    fn with_boundary(file: &'a SourceFile, chunk: &ChunkSpec, boundary: String) -> Self {
        let head = format!(
            "--{b}\r\n\
             Content-Disposition: form-data; name=\"index\"\r\n\r\n\
             {index}\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"chunkSize\"\r\n\r\n\
             {len}\r\n\
             --{b}\r\n\
             Content-Disposition: form-data; name=\"chunkFile\"; filename=\"chunk-{index}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n",
            b = boundary,
            index = chunk.index,
            len = chunk.len(),
        )
        .into_bytes();
        let tail = format!("\r\n--{}--\r\n", boundary).into_bytes();
        Self {
            file,
            chunk: *chunk,
            boundary,
            head,
            tail,
            pos: 0,
        }
    }

    pub(crate) fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Total body length; sent as Content-Length.
    pub(crate) fn len(&self) -> u64 {
        self.head.len() as u64 + self.chunk.len() + self.tail.len() as u64
    }
}

impl Read for ChunkBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let head_len = self.head.len() as u64;
        let data_end = head_len + self.chunk.len();
        let n = if self.pos < head_len {
            copy_from(&self.head[self.pos as usize..], buf)
        } else if self.pos < data_end {
            let off = self.pos - head_len;
            let n = (buf.len() as u64).min(self.chunk.len() - off) as usize;
            self.file
                .read_exact_at(&mut buf[..n], self.chunk.start + off)?;
            n
        } else {
            let off = (self.pos - data_end) as usize;
            if off >= self.tail.len() {
                return Ok(0);
            }
            copy_from(&self.tail[off..], buf)
        };
        self.pos += n as u64;
        Ok(n)
    }
}

fn copy_from(src: &[u8], buf: &mut [u8]) -> usize {
    let n = src.len().min(buf.len());
    buf[..n].copy_from_slice(&src[..n]);
    n
}
