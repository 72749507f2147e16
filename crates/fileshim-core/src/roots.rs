use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use fileshim_platform::paths::RootPaths;
use serde::Serialize;

use crate::entry::{AllPaths, FilesystemKind};
use crate::path::normalize_path;

/// A named base directory under which sandboxed resolution happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Root {
    Application,
    Data,
    Documents,
    Cache,
    Temp,
}

impl Root {
    pub const ALL: [Root; 5] = [
        Root::Application,
        Root::Data,
        Root::Documents,
        Root::Cache,
        Root::Temp,
    ];

    pub fn filesystem_kind(self) -> FilesystemKind {
        match self {
            Root::Cache | Root::Temp => FilesystemKind::Temporary,
            Root::Application | Root::Data | Root::Documents => FilesystemKind::Persistent,
        }
    }
}

/// Read-only mapping from [`Root`] to absolute base path, built once at
/// startup and shared by every resolver call.
#[derive(Debug, Clone)]
pub struct RootTable {
    /// Indexed by `Root as usize`, in the order of [`Root::ALL`]
    paths: [PathBuf; 5],
}

impl RootTable {
    pub fn new(paths: RootPaths) -> Self {
        let RootPaths {
            application,
            data,
            documents,
            cache,
            temp,
        } = paths;

        Self {
            paths: [application, data, documents, cache, temp].map(|p| normalize_path(&p)),
        }
    }

    pub fn path(&self, root: Root) -> &Path {
        &self.paths[root as usize]
    }

    fn iter(&self) -> impl Iterator<Item = (Root, &Path)> {
        Root::ALL.iter().map(move |&root| (root, self.path(root)))
    }

    /// Innermost root containing `path`. Matching is per component, so
    /// `/data-other` is not under `/data`. `path` must already be normalized.
    pub fn containing(&self, path: &Path) -> Option<(Root, &Path)> {
        self.iter()
            .filter(|(_, base)| path.starts_with(base))
            .max_by_key(|(_, base)| base.components().count())
    }

    pub fn is_root(&self, path: &Path) -> bool {
        self.iter().any(|(_, base)| base == path)
    }

    pub fn filesystem_kind(&self, path: &Path) -> FilesystemKind {
        self.containing(path)
            .map(|(root, _)| root.filesystem_kind())
            .unwrap_or(FilesystemKind::Persistent)
    }

    pub fn all_paths(&self) -> AllPaths {
        let dir = |root| with_trailing_separator(self.path(root));
        AllPaths {
            application_directory: dir(Root::Application),
            data_directory: dir(Root::Data),
            documents_directory: dir(Root::Documents),
            cache_directory: dir(Root::Cache),
            temp_directory: dir(Root::Temp),
        }
    }
}

fn with_trailing_separator(path: &Path) -> String {
    let mut s = path.to_string_lossy().to_string();
    if !s.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR);
    }
    s
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn table_under(base: &Path) -> RootTable {
        RootTable::new(RootPaths {
            application: base.join("app"),
            data: base.join("data"),
            documents: base.join("documents"),
            cache: base.join("data").join("cache"),
            temp: base.join("tmp"),
        })
    }

    #[test]
    fn test_containing_is_component_wise() {
        let base = std::env::temp_dir();
        let table = table_under(&base);

        let (root, _) = table.containing(&base.join("data").join("a.txt")).unwrap();
        assert_eq!(root, Root::Data);
        assert!(table.containing(&base.join("data-other")).is_none());
        assert!(table.containing(&base).is_none());
    }

    #[test]
    fn test_innermost_root_wins() {
        let base = std::env::temp_dir();
        let table = table_under(&base);

        let (root, path) = table
            .containing(&base.join("data").join("cache").join("x"))
            .unwrap();
        assert_eq!(root, Root::Cache);
        assert_eq!(path, base.join("data").join("cache"));
        assert_eq!(
            table.filesystem_kind(&base.join("data").join("cache").join("x")),
            FilesystemKind::Temporary
        );
    }

    #[test]
    fn test_all_paths_end_with_separator() {
        let base = std::env::temp_dir();
        let table = table_under(&base);
        let paths = table.all_paths();

        for p in [
            &paths.application_directory,
            &paths.data_directory,
            &paths.documents_directory,
            &paths.cache_directory,
            &paths.temp_directory,
        ] {
            assert!(p.ends_with(MAIN_SEPARATOR), "{p} lacks a trailing separator");
        }
        assert!(table.is_root(&base.join("tmp")));
        assert!(!table.is_root(&base.join("tmp").join("x")));
    }
}
