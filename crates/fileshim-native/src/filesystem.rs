use std::fs::Metadata;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use fileshim_platform::filesystem::{DirEntryInfo, FileSystem, NativeStat};
use tokio::fs as tfs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

/// Upper bound for the initial read buffer, so a huge requested range does not
/// allocate before we know how much the file actually holds.
const READ_CAPACITY_HINT: u64 = 64 * 1024;

/// [`FileSystem`] backed by `tokio::fs` on the local disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    fn to_native_stat(meta: &Metadata) -> NativeStat {
        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64);

        NativeStat {
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            size: meta.len(),
            modified,
        }
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn stat(&self, path: &Path) -> io::Result<NativeStat> {
        let meta = tfs::metadata(path).await?;
        Ok(Self::to_native_stat(&meta))
    }

    async fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        tfs::canonicalize(path).await
    }

    async fn create_dir(&self, path: &Path) -> io::Result<()> {
        tfs::create_dir(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        tfs::create_dir_all(path).await
    }

    async fn create_new(&self, path: &Path) -> io::Result<NativeStat> {
        let file = tfs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        let meta = file.metadata().await?;
        Ok(Self::to_native_stat(&meta))
    }

    async fn open_append(&self, path: &Path) -> io::Result<NativeStat> {
        let file = tfs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        let meta = file.metadata().await?;
        Ok(Self::to_native_stat(&meta))
    }

    async fn read_range(&self, path: &Path, offset: u64, len: u64) -> io::Result<Vec<u8>> {
        let mut file = tfs::File::open(path).await?;
        file.seek(SeekFrom::Start(offset)).await?;

        let mut buf = Vec::with_capacity(len.min(READ_CAPACITY_HINT) as usize);
        file.take(len).read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn append(&self, path: &Path, data: &[u8]) -> io::Result<u64> {
        let mut file = tfs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(data).await?;
        // tokio completes writes in the background; flush waits for them
        file.flush().await?;
        Ok(data.len() as u64)
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        tfs::rename(from, to).await
    }

    async fn copy_file(&self, from: &Path, to: &Path) -> io::Result<u64> {
        tfs::copy(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        tfs::remove_file(path).await
    }

    async fn remove_dir(&self, path: &Path) -> io::Result<()> {
        tfs::remove_dir(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        tfs::remove_dir_all(path).await
    }

    async fn truncate(&self, path: &Path, len: u64) -> io::Result<()> {
        let file = tfs::OpenOptions::new().write(true).open(path).await?;
        file.set_len(len).await
    }

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut entries = tfs::read_dir(path).await?;

        let mut result = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            result.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().to_string(),
                is_dir: file_type.is_dir(),
                is_file: file_type.is_file(),
            });
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_new_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = temp.path().join("a.txt");

        let stat = fs.create_new(&path).await.unwrap();
        assert!(stat.is_file);
        assert_eq!(stat.size, 0);

        let err = fs.create_new(&path).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_open_append_keeps_content() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, b"hello").unwrap();

        let stat = fs.open_append(&path).await.unwrap();
        assert_eq!(stat.size, 5);
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_read_range_past_eof_is_short() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        assert_eq!(fs.read_range(&path, 2, 3).await.unwrap(), b"234");
        assert_eq!(fs.read_range(&path, 8, 100).await.unwrap(), b"89");
        assert!(fs.read_range(&path, 20, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_extends_file() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = temp.path().join("log.txt");

        assert_eq!(fs.append(&path, b"ab").await.unwrap(), 2);
        assert_eq!(fs.append(&path, b"cd").await.unwrap(), 2);
        assert_eq!(std::fs::read(&path).unwrap(), b"abcd");
    }

    #[tokio::test]
    async fn test_read_dir_reports_types() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        std::fs::write(temp.path().join("a.txt"), b"").unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();

        let mut entries = fs.read_dir(temp.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.txt");
        assert!(entries[0].is_file && !entries[0].is_dir);
        assert_eq!(entries[1].name, "sub");
        assert!(entries[1].is_dir && !entries[1].is_file);
    }

    #[tokio::test]
    async fn test_truncate_shrinks() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        fs.truncate(&path, 4).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"0123");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_canonicalize_follows_symlinks() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        std::fs::create_dir(temp.path().join("real")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("real"), temp.path().join("link")).unwrap();

        let real = fs.canonicalize(&temp.path().join("real")).await.unwrap();
        assert_eq!(fs.canonicalize(&temp.path().join("link")).await.unwrap(), real);

        let err = fs.canonicalize(&temp.path().join("missing")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
