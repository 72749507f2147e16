//! Path resolution: normalization, child joining, root sandboxing and
//! `file://` URI decoding. Pure, no I/O.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::error::{ErrorKind, Result};
use crate::roots::RootTable;

/// Lexically normalize a path: drop `.`, let `..` pop the previous component.
/// Never touches the filesystem, so symlinks are not resolved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = path.components().peekable();
    let mut ret = if let Some(c @ Component::Prefix(..)) = components.peek().cloned() {
        components.next();
        PathBuf::from(c.as_os_str())
    } else {
        PathBuf::new()
    };

    for component in components {
        match component {
            Component::Prefix(..) => {}
            Component::RootDir => {
                ret.push(component.as_os_str());
            }
            Component::CurDir => {}
            Component::ParentDir => {
                ret.pop();
            }
            Component::Normal(c) => {
                ret.push(c);
            }
        }
    }
    ret
}

/// Join `child` under `base`. A leading separator on `child` is ignored so the
/// child can never replace the base.
pub fn join_child(base: &Path, child: &str) -> PathBuf {
    let child = child.trim_start_matches(['/', '\\']);
    normalize_path(&base.join(child))
}

pub fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Resolve `child` against `base`, sandboxed to the root containing `base`.
///
/// Fails `NotReadable` when `base` lies outside every root and `Security` when
/// the result climbs out of that root. Symlinks are not followed here.
pub fn resolve(roots: &RootTable, base: &Path, child: &str) -> Result<PathBuf> {
    let base = normalize_path(base);
    let (_, root_path) = roots.containing(&base).ok_or(ErrorKind::NotReadable)?;

    let path = join_child(&base, child);
    if !path.starts_with(root_path) {
        tracing::warn!(
            base = %base.display(),
            child,
            "rejected path escaping its root"
        );
        return Err(ErrorKind::Security.into());
    }
    Ok(path)
}

/// Turn a `file://` URI or a plain path into a path. Any other scheme, a
/// malformed URI or a remote host fails `Encoding`.
pub fn from_uri(uri: &str) -> Result<PathBuf> {
    if !uri.contains("://") {
        return Ok(PathBuf::from(uri));
    }

    let url = Url::parse(uri).map_err(|e| {
        tracing::debug!(uri, "unparseable URI: {}", e);
        ErrorKind::Encoding
    })?;
    if url.scheme() != "file" {
        return Err(ErrorKind::Encoding.into());
    }
    url.to_file_path().map_err(|()| ErrorKind::Encoding.into())
}
