//! The entry resolver: File API semantics on top of native primitives.
//!
//! Every operation normalizes and sandboxes its paths first, probes the target
//! at most once, and then branches on (exists, is directory, options). Only
//! the branches that are meant to mutate issue a mutating native call.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fileshim_platform::filesystem::{FileSystem, NativeStat};
use tracing::{debug, info, warn};

use crate::encoding::{self, TextEncoding};
use crate::entry::{AllPaths, Entry, FileMetadata, FileSystemInfo, FilesystemKind, OperationOptions};
use crate::error::{ErrorKind, FileError, Result};
use crate::mime;
use crate::path::{self, base_name, normalize_path};
use crate::roots::{Root, RootTable};

pub struct Resolver {
    fs: Arc<dyn FileSystem>,
    roots: Arc<RootTable>,
}

impl Resolver {
    pub fn new(fs: Arc<dyn FileSystem>, roots: RootTable) -> Self {
        Self {
            fs,
            roots: Arc::new(roots),
        }
    }

    /// Single existence probe. "Not found" is an answer, not an error; any
    /// other native failure is passed through unchanged.
    async fn probe(&self, path: &Path) -> Result<Option<NativeStat>> {
        match self.fs.stat(path).await {
            Ok(stat) => Ok(Some(stat)),
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                Ok(None)
            }
            Err(e) => Err(FileError::Io(e)),
        }
    }

    fn entry(&self, path: &Path, stat: &NativeStat) -> Entry {
        Entry::from_stat(path, stat, self.roots.filesystem_kind(path))
    }

    /// Resolve `child` under `base` and confine the result to its root,
    /// following symlinks along the part of the path that already exists.
    async fn resolve(&self, base: &Path, child: &str) -> Result<PathBuf> {
        let path = path::resolve(&self.roots, base, child)?;
        self.confine(&path).await?;
        Ok(path)
    }

    async fn sandboxed(&self, path: &Path) -> Result<PathBuf> {
        self.resolve(path, "").await
    }

    /// Fails `Security` when the deepest existing ancestor of `path` resolves
    /// outside the root that lexically contains it.
    async fn confine(&self, path: &Path) -> Result<()> {
        let (_, root_path) = self.roots.containing(path).ok_or(ErrorKind::NotReadable)?;
        let real_root = match self.fs.canonicalize(root_path).await {
            Ok(real) => real,
            // nothing exists below a missing root, so nothing can point out of it
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(FileError::Io(e)),
        };

        let mut existing = path;
        loop {
            match self.fs.canonicalize(existing).await {
                Ok(real) if real.starts_with(&real_root) => return Ok(()),
                Ok(real) => {
                    warn!(
                        path = %path.display(),
                        target = %real.display(),
                        "rejected path leaving its root through a symlink"
                    );
                    return Err(ErrorKind::Security.into());
                }
                Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                    existing = match existing.parent() {
                        Some(parent) => parent,
                        None => return Ok(()),
                    };
                }
                Err(e) => return Err(FileError::Io(e)),
            }
        }
    }

    /// The five root paths, each with a trailing separator
    pub fn request_all_paths(&self) -> AllPaths {
        self.roots.all_paths()
    }

    /// Get or create the directory `path` under `root`.
    pub async fn get_directory(
        &self,
        root: &Path,
        path: &str,
        options: OperationOptions,
    ) -> Result<Entry> {
        let target = self.resolve(root, path).await?;
        debug!(path = %target.display(), ?options, "getDirectory");

        match (self.probe(&target).await?, options.create, options.exclusive) {
            (Some(_), true, true) => Err(ErrorKind::PathExists.into()),
            (Some(stat), _, _) if stat.is_dir => Ok(self.entry(&target, &stat)),
            (Some(_), true, false) => Err(ErrorKind::InvalidModification.into()),
            (Some(_), false, _) => Err(ErrorKind::TypeMismatch.into()),
            (None, true, exclusive) => self.create_directory(&target, exclusive).await,
            (None, false, _) if self.roots.is_root(&target) => {
                // roots always exist; materialize them on first use
                self.fs.create_dir_all(&target).await?;
                let stat = self.fs.stat(&target).await?;
                Ok(self.entry(&target, &stat))
            }
            (None, false, _) => Err(ErrorKind::NotFound.into()),
        }
    }

    async fn create_directory(&self, path: &Path, exclusive: bool) -> Result<Entry> {
        match self.fs.create_dir(path).await {
            Ok(()) => {
                info!("created directory {}", path.display());
                let stat = self.fs.stat(path).await?;
                Ok(self.entry(path, &stat))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && !exclusive => {
                // lost a creation race; fall back to the existing-entry rules
                let stat = self.fs.stat(path).await?;
                if stat.is_dir {
                    Ok(self.entry(path, &stat))
                } else {
                    Err(ErrorKind::InvalidModification.into())
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Get or create the file `path` under `root`.
    ///
    /// An existing file opened with `create` is opened for append, never
    /// truncated. A missing file without `create` fails `NotFound`.
    pub async fn get_file(&self, root: &Path, path: &str, options: OperationOptions) -> Result<Entry> {
        let target = self.resolve(root, path).await?;
        debug!(path = %target.display(), ?options, "getFile");

        match (self.probe(&target).await?, options.create, options.exclusive) {
            (Some(_), true, true) => Err(ErrorKind::PathExists.into()),
            (Some(stat), true, false) if stat.is_dir => Err(ErrorKind::InvalidModification.into()),
            (Some(_), true, false) => {
                let stat = self.fs.open_append(&target).await?;
                Ok(self.entry(&target, &stat))
            }
            (Some(stat), false, _) if stat.is_dir => Err(ErrorKind::TypeMismatch.into()),
            (Some(stat), false, _) => Ok(self.entry(&target, &stat)),
            (None, true, exclusive) => self.create_file(&target, exclusive).await,
            (None, false, _) => Err(ErrorKind::NotFound.into()),
        }
    }

    async fn create_file(&self, path: &Path, exclusive: bool) -> Result<Entry> {
        match self.fs.create_new(path).await {
            Ok(stat) => {
                info!("created file {}", path.display());
                Ok(self.entry(path, &stat))
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && !exclusive => {
                let stat = self.fs.stat(path).await?;
                if stat.is_dir {
                    return Err(ErrorKind::InvalidModification.into());
                }
                let stat = self.fs.open_append(path).await?;
                Ok(self.entry(path, &stat))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Immediate children in native directory order.
    pub async fn read_entries(&self, path: &Path) -> Result<Vec<Entry>> {
        let dir = self.sandboxed(path).await?;
        let kind = self.roots.filesystem_kind(&dir);

        let children = self.fs.read_dir(&dir).await?;
        debug!(path = %dir.display(), count = children.len(), "readEntries");

        Ok(children
            .iter()
            .map(|child| Entry::from_dir_entry(&dir, child, kind))
            .collect())
    }

    pub async fn get_file_metadata(&self, path: &Path) -> Result<FileMetadata> {
        let path = self.sandboxed(path).await?;
        let stat = self.fs.stat(&path).await?;
        let name = base_name(&path);

        Ok(FileMetadata {
            mime_type: mime::lookup(&name).to_string(),
            full_path: path.to_string_lossy().to_string(),
            name,
            size: stat.size,
            last_modified_date: stat.modified,
        })
    }

    pub async fn set_metadata(&self) -> Result<()> {
        Err(FileError::Unsupported("setMetadata".to_string()))
    }

    pub async fn get_parent(&self) -> Result<Entry> {
        Err(FileError::Unsupported("getParent".to_string()))
    }

    /// Source and destination of a move or copy, validated.
    async fn transfer_paths(
        &self,
        src: &Path,
        parent: &Path,
        name: Option<&str>,
    ) -> Result<(PathBuf, NativeStat, PathBuf)> {
        let src = self.sandboxed(src).await?;
        let src_stat = self.probe(&src).await?.ok_or(ErrorKind::NotFound)?;

        let parent = self.sandboxed(parent).await?;
        match self.probe(&parent).await? {
            Some(stat) if stat.is_dir => {}
            Some(_) => return Err(ErrorKind::TypeMismatch.into()),
            None => return Err(ErrorKind::NotFound.into()),
        }

        let name = match name {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => base_name(&src),
        };
        let dest = self.resolve(&parent, &name).await?;

        // onto itself, into its own subtree, or over one of its ancestors
        if dest == src || (src_stat.is_dir && dest.starts_with(&src)) || src.starts_with(&dest) {
            return Err(ErrorKind::InvalidModification.into());
        }
        if self.roots.is_root(&dest) {
            return Err(ErrorKind::NoModificationAllowed.into());
        }

        Ok((src, src_stat, dest))
    }

    /// Move `src` to `parent/name`, replacing whatever is there.
    pub async fn move_to(&self, src: &Path, parent: &Path, name: Option<&str>) -> Result<Entry> {
        if self.roots.is_root(&normalize_path(src)) {
            return Err(ErrorKind::NoModificationAllowed.into());
        }
        let (src, _, dest) = self.transfer_paths(src, parent, name).await?;

        if let Some(existing) = self.probe(&dest).await? {
            debug!(path = %dest.display(), "clearing move destination");
            if existing.is_dir {
                self.fs.remove_dir_all(&dest).await?;
            } else {
                self.fs.remove_file(&dest).await?;
            }
        }

        self.fs.rename(&src, &dest).await?;
        info!("moved {} -> {}", src.display(), dest.display());

        let stat = self.fs.stat(&dest).await?;
        Ok(self.entry(&dest, &stat))
    }

    /// Copy `src` to `parent/name`. Directories are copied recursively.
    pub async fn copy_to(&self, src: &Path, parent: &Path, name: Option<&str>) -> Result<Entry> {
        let (src, src_stat, dest) = self.transfer_paths(src, parent, name).await?;

        if src_stat.is_dir {
            self.copy_tree(&src, &dest).await?;
        } else {
            self.fs.copy_file(&src, &dest).await?;
        }
        info!("copied {} -> {}", src.display(), dest.display());

        let stat = self.fs.stat(&dest).await?;
        Ok(self.entry(&dest, &stat))
    }

    async fn copy_tree(&self, from: &Path, to: &Path) -> Result<()> {
        let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];

        while let Some((from, to)) = pending.pop() {
            match self.fs.create_dir(&to).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e.into()),
            }

            for child in self.fs.read_dir(&from).await? {
                let (child_from, child_to) = (from.join(&child.name), to.join(&child.name));
                if child.is_dir {
                    pending.push((child_from, child_to));
                } else {
                    self.fs.copy_file(&child_from, &child_to).await?;
                }
            }
        }

        Ok(())
    }

    /// Remove a file or an empty directory. A missing target is not an error.
    pub async fn remove(&self, path: &Path) -> Result<()> {
        let path = self.sandboxed(path).await?;
        if self.roots.is_root(&path) {
            return Err(ErrorKind::NoModificationAllowed.into());
        }

        let Some(stat) = self.probe(&path).await? else {
            debug!(path = %path.display(), "remove: already absent");
            return Ok(());
        };

        let result = if stat.is_dir {
            self.fs.remove_dir(&path).await
        } else {
            self.fs.remove_file(&path).await
        };

        match result {
            Ok(()) => {
                info!("removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a directory and everything below it.
    pub async fn remove_recursively(&self, path: &Path) -> Result<()> {
        let path = self.sandboxed(path).await?;
        if self.roots.is_root(&path) {
            return Err(ErrorKind::NoModificationAllowed.into());
        }

        let stat = self.probe(&path).await?.ok_or(ErrorKind::NotFound)?;
        if !stat.is_dir {
            return Err(ErrorKind::InvalidState.into());
        }

        self.fs.remove_dir_all(&path).await?;
        info!("removed tree {}", path.display());
        Ok(())
    }

    /// Set the file length. The length itself is left to the native layer.
    pub async fn truncate(&self, path: Option<&Path>, len: u64) -> Result<u64> {
        let path = match path {
            Some(p) if !p.as_os_str().is_empty() => self.sandboxed(p).await?,
            _ => return Err(ErrorKind::NotFound.into()),
        };

        self.fs.truncate(&path, len).await?;
        info!("truncated {} to {} bytes", path.display(), len);
        Ok(len)
    }

    /// Bytes in `[start, end)`. Past EOF the result is simply shorter.
    async fn read_range(&self, path: &Path, start: u64, end: u64) -> Result<Vec<u8>> {
        let path = self.sandboxed(path).await?;
        let len = end.saturating_sub(start);
        Ok(self.fs.read_range(&path, start, len).await?)
    }

    pub async fn read_as_text(&self, path: &Path, encoding: &str, start: u64, end: u64) -> Result<String> {
        let encoding: TextEncoding = encoding.parse()?;
        let bytes = self.read_range(path, start, end).await?;
        Ok(encoding.decode(&bytes))
    }

    pub async fn read_as_binary_string(&self, path: &Path, start: u64, end: u64) -> Result<String> {
        let bytes = self.read_range(path, start, end).await?;
        Ok(encoding::binary_string(&bytes))
    }

    pub async fn read_as_array_buffer(&self, path: &Path, start: u64, end: u64) -> Result<Vec<u8>> {
        self.read_range(path, start, end).await
    }

    pub async fn read_as_data_url(&self, path: &Path, start: u64, end: u64) -> Result<String> {
        let bytes = self.read_range(path, start, end).await?;
        let mime_type = mime::lookup(&base_name(path));
        Ok(encoding::data_url(mime_type, &bytes))
    }

    /// Append `data` to the file, creating it when missing.
    ///
    /// `offset` is accepted for API compatibility but ignored: writes always
    /// land at the end of the file.
    pub async fn write(&self, path: &Path, data: &[u8], offset: u64, is_binary: bool) -> Result<u64> {
        let path = self.sandboxed(path).await?;
        if offset != 0 {
            debug!(offset, "write offset ignored, appending");
        }

        let written = self.fs.append(&path, data).await?;
        info!(
            "wrote {} bytes to {} (binary={})",
            written,
            path.display(),
            is_binary
        );
        Ok(written)
    }

    /// Resolve a root descriptor for `path`, creating the directory if needed.
    pub async fn resolve_root(&self, path: &Path) -> Result<FileSystemInfo> {
        let path = self.sandboxed(path).await?;
        let (root, _) = self.roots.containing(&path).ok_or(ErrorKind::NotReadable)?;

        let stat = match self.probe(&path).await? {
            Some(stat) if stat.is_dir => stat,
            Some(_) => return Err(ErrorKind::TypeMismatch.into()),
            None => {
                info!("creating filesystem root {}", path.display());
                self.fs.create_dir_all(&path).await?;
                self.fs.stat(&path).await?
            }
        };

        let kind = root.filesystem_kind();
        Ok(FileSystemInfo {
            name: kind.name().to_string(),
            root: Entry::from_stat(&path, &stat, kind),
        })
    }

    /// `type` 0 maps to the temp root, 1 to the data root. There is no quota,
    /// so `size` is only logged.
    pub async fn request_file_system(&self, fs_type: u32, size: u64) -> Result<FileSystemInfo> {
        let root = match FilesystemKind::from_type(fs_type).ok_or(ErrorKind::Syntax)? {
            FilesystemKind::Temporary => Root::Temp,
            FilesystemKind::Persistent => Root::Data,
        };
        debug!(fs_type, size, "requestFileSystem");

        self.resolve_root(self.roots.path(root)).await
    }

    pub async fn resolve_local_file_system_uri(&self, uri: &str) -> Result<Entry> {
        let path = self.sandboxed(&path::from_uri(uri)?).await?;

        let stat = self.fs.stat(&path).await?;
        Ok(self.entry(&path, &stat))
    }
}
