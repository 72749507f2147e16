use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of a single stat-like probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeStat {
    pub is_dir: bool,
    pub is_file: bool,
    pub size: u64,
    /// Modification time in milliseconds since the Unix epoch
    pub modified: Option<u64>,
}

/// A directory child as reported by readdir, without a follow-up stat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub is_dir: bool,
    pub is_file: bool,
}

/// Native filesystem primitives.
///
/// Each method is one native call (or one open/use/close sequence) and is
/// trusted to be individually atomic. Errors are returned as raw
/// [`io::Error`]s so callers can branch on [`io::ErrorKind`].
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Stat a path, following symlinks
    async fn stat(&self, path: &Path) -> io::Result<NativeStat>;

    /// Absolute path with every symlink resolved; fails if `path` is missing
    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Create a single directory; fails if it already exists
    async fn create_dir(&self, path: &Path) -> io::Result<()>;

    /// Create a directory and any missing parents
    async fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Atomically create an empty file; fails with `AlreadyExists` if anything
    /// is already at `path`. Returns the stat of the new file.
    async fn create_new(&self, path: &Path) -> io::Result<NativeStat>;

    /// Open (creating if needed) in append mode without truncating, then close.
    async fn open_append(&self, path: &Path) -> io::Result<NativeStat>;

    /// Read up to `len` bytes starting at `offset`. A short result means EOF.
    async fn read_range(&self, path: &Path, offset: u64, len: u64) -> io::Result<Vec<u8>>;

    /// Append `data` to the file, creating it when missing. Returns bytes written.
    async fn append(&self, path: &Path, data: &[u8]) -> io::Result<u64>;

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy a regular file, overwriting `to`. Returns bytes copied.
    async fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64>;

    async fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Remove an empty directory
    async fn remove_dir(&self, path: &Path) -> io::Result<()>;

    /// Remove a directory and everything below it
    async fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Set the file length
    async fn truncate(&self, path: &Path, len: u64) -> io::Result<()>;

    /// List immediate children in native order
    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>>;
}
