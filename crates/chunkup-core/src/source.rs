//! The user's selected file: display name, length, content type and
//! positional range reads.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

/// The only content type the uploader accepts.
pub const ACCEPTED_CONTENT_TYPE: &str = "application/zip";

/// Content type from the file extension, the way a browser fills `File.type`.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("zip") => "application/zip",
        Some("gz") | Some("tgz") => "application/gzip",
        Some("tar") => "application/x-tar",
        Some("json") => "application/json",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Read-only handle on the file being uploaded.
///
/// Range reads never move a shared cursor, so concurrent chunk uploads can
/// read from the same `SourceFile` without coordination.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    name: String,
    len: u64,
    content_type: &'static str,
    file: File,
}

impl SourceFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path: path.to_path_buf(),
            name,
            len: meta.len(),
            content_type: content_type_for(path),
            file,
        })
    }

    /// Display name (final path component); sent as `filename` in the patch call.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    /// Reads exactly the bytes in `[start, end)`.
    pub fn read_range(&self, start: u64, end: u64) -> io::Result<Vec<u8>> {
        if start > end || end > self.len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "{}: range {}..{} outside file of {} bytes",
                    self.path.display(),
                    start,
                    end,
                    self.len
                ),
            ));
        }
        let mut buf = vec![0u8; (end - start) as usize];
        self.read_exact_at(&mut buf, start)?;
        Ok(buf)
    }

    /// Fills `buf` from `offset` without touching any shared cursor.
    #[cfg(unix)]
    pub(crate) fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        use std::os::unix::fs::FileExt;
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(not(unix))]
    pub(crate) fn read_exact_at(&self, buf: &mut [u8], offset: u64) -> io::Result<()> {
        use std::io::{Read, Seek, SeekFrom};
        // Fresh handle per read: no cursor shared between threads.
        let mut f = File::open(&self.path)?;
        f.seek(SeekFrom::Start(offset))?;
        f.read_exact(buf)
    }
}
