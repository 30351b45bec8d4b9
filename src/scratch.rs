//! Scratch storage: the injected temp-file capability used to stage the
//! encoded TIFF before it is handed back to the caller as a byte blob.
//!
//! ## Why a trait instead of a hardcoded temp path?
//!
//! The merge runs inside web-request handlers where many conversions may be
//! in flight at once. Each call needs a uniquely named scratch resource and
//! a hard guarantee that it is released on every exit path — success,
//! partial failure, panic, or caller-side cancellation. Injecting the
//! provider through [`crate::config::FaxConfig`] also lets tests substitute
//! [`MemoryScratch`] and assert that nothing is left behind on disk.
//!
//! [`TempScratch`] relies on [`tempfile::tempfile_in`], which creates the
//! file already unlinked (on Unix) so the OS reclaims it as soon as the
//! handle drops, no matter how the call ends.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

/// Provider of per-call scratch buffers.
///
/// Implementations must hand out independent buffers on every call so
/// concurrent merges never collide.
pub trait ScratchSpace: Send + Sync + std::fmt::Debug {
    /// Open a fresh scratch buffer. Dropping the returned handle releases
    /// the underlying resource.
    fn create(&self) -> io::Result<Box<dyn ScratchBuffer>>;
}

/// A writable, seekable staging buffer consumed into its final bytes.
pub trait ScratchBuffer: Write + Seek + Send {
    /// Read back everything written so far and release the buffer.
    fn into_bytes(self: Box<Self>) -> io::Result<Vec<u8>>;
}

// ── tempfile-backed default ──────────────────────────────────────────────

/// Default scratch provider backed by anonymous temp files.
#[derive(Debug, Clone, Default)]
pub struct TempScratch {
    /// Directory to stage files in; `None` means the system temp dir.
    dir: Option<PathBuf>,
}

impl TempScratch {
    /// Stage scratch files in a specific directory instead of the system
    /// temp dir. Useful when the temp partition is small or noexec-mounted.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl ScratchSpace for TempScratch {
    fn create(&self) -> io::Result<Box<dyn ScratchBuffer>> {
        let file = match &self.dir {
            Some(dir) => tempfile::tempfile_in(dir)?,
            None => tempfile::tempfile()?,
        };
        Ok(Box::new(FileBuffer { file }))
    }
}

struct FileBuffer {
    file: std::fs::File,
}

impl Write for FileBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for FileBuffer {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl ScratchBuffer for FileBuffer {
    fn into_bytes(mut self: Box<Self>) -> io::Result<Vec<u8>> {
        self.file.flush()?;
        let len = self.file.seek(SeekFrom::End(0))?;
        self.file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::with_capacity(len as usize);
        self.file.read_to_end(&mut bytes)?;
        Ok(bytes)
        // `self.file` drops here; the unlinked inode is reclaimed by the OS
    }
}

// ── In-memory implementation for tests and sandboxes ─────────────────────

/// Scratch provider that stages everything in memory. No filesystem access.
#[derive(Debug, Clone, Default)]
pub struct MemoryScratch;

impl ScratchSpace for MemoryScratch {
    fn create(&self) -> io::Result<Box<dyn ScratchBuffer>> {
        Ok(Box::new(io::Cursor::new(Vec::new())))
    }
}

impl ScratchBuffer for io::Cursor<Vec<u8>> {
    fn into_bytes(self: Box<Self>) -> io::Result<Vec<u8>> {
        Ok(self.into_inner())
    }
}
