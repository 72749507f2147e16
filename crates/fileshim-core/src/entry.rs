use std::path::{Path, MAIN_SEPARATOR};

use fileshim_platform::filesystem::{DirEntryInfo, NativeStat};
use serde::{Deserialize, Serialize};

use crate::path::base_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilesystemKind {
    Temporary,
    Persistent,
}

impl FilesystemKind {
    /// Map the File API `type` argument (0 = TEMPORARY, 1 = PERSISTENT)
    pub fn from_type(fs_type: u32) -> Option<Self> {
        match fs_type {
            0 => Some(FilesystemKind::Temporary),
            1 => Some(FilesystemKind::Persistent),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilesystemKind::Temporary => "temporary",
            FilesystemKind::Persistent => "persistent",
        }
    }
}

/// Snapshot of a resolved file or directory.
///
/// `size` and `last_modified_date` are only known when the entry came from a
/// stat; entries listed by `read_entries` carry the readdir type alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub name: String,
    pub full_path: String,
    pub is_file: bool,
    pub is_directory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Milliseconds since the Unix epoch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<u64>,
    pub filesystem_kind: FilesystemKind,
}

impl Entry {
    pub(crate) fn from_stat(path: &Path, stat: &NativeStat, kind: FilesystemKind) -> Self {
        Self {
            name: base_name(path),
            full_path: path.to_string_lossy().to_string(),
            is_file: stat.is_file,
            is_directory: stat.is_dir,
            size: Some(stat.size),
            last_modified_date: stat.modified,
            filesystem_kind: kind,
        }
    }

    /// Subdirectories get a trailing separator so callers can tell them apart
    /// from files by path alone.
    pub(crate) fn from_dir_entry(parent: &Path, child: &DirEntryInfo, kind: FilesystemKind) -> Self {
        let mut full_path = parent.join(&child.name).to_string_lossy().to_string();
        if child.is_dir {
            full_path.push(MAIN_SEPARATOR);
        }

        Self {
            name: child.name.clone(),
            full_path,
            is_file: child.is_file,
            is_directory: child.is_dir,
            size: None,
            last_modified_date: None,
            filesystem_kind: kind,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationOptions {
    pub create: bool,
    pub exclusive: bool,
}

impl OperationOptions {
    pub fn create() -> Self {
        Self {
            create: true,
            exclusive: false,
        }
    }

    pub fn create_exclusive() -> Self {
        Self {
            create: true,
            exclusive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: String,
    pub full_path: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<u64>,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Root descriptor returned by filesystem resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSystemInfo {
    pub name: String,
    pub root: Entry,
}

/// The root table as reported to callers, each path ending in a separator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllPaths {
    pub application_directory: String,
    pub data_directory: String,
    pub documents_directory: String,
    pub cache_directory: String,
    pub temp_directory: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_entry_gets_trailing_separator() {
        let parent = Path::new("/data");
        let dir = DirEntryInfo {
            name: "sub".to_string(),
            is_dir: true,
            is_file: false,
        };
        let file = DirEntryInfo {
            name: "a.txt".to_string(),
            is_dir: false,
            is_file: true,
        };

        let dir_entry = Entry::from_dir_entry(parent, &dir, FilesystemKind::Persistent);
        assert!(dir_entry.full_path.ends_with(MAIN_SEPARATOR));
        assert!(dir_entry.is_directory);

        let file_entry = Entry::from_dir_entry(parent, &file, FilesystemKind::Persistent);
        assert!(!file_entry.full_path.ends_with(MAIN_SEPARATOR));
        assert!(file_entry.is_file);
        assert_eq!(file_entry.size, None);
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let stat = NativeStat {
            is_dir: false,
            is_file: true,
            size: 3,
            modified: Some(1_700_000_000_000),
        };
        let entry = Entry::from_stat(Path::new("/data/a.txt"), &stat, FilesystemKind::Temporary);
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["name"], "a.txt");
        assert_eq!(json["isFile"], true);
        assert_eq!(json["isDirectory"], false);
        assert_eq!(json["lastModifiedDate"], 1_700_000_000_000u64);
        assert_eq!(json["filesystemKind"], "temporary");
    }

    #[test]
    fn test_options_default_from_partial_json() {
        let opts: OperationOptions = serde_json::from_str(r#"{"create":true}"#).unwrap();
        assert_eq!(opts, OperationOptions::create());

        let opts: OperationOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, OperationOptions::default());
    }

    #[test]
    fn test_filesystem_type_mapping() {
        assert_eq!(FilesystemKind::from_type(0), Some(FilesystemKind::Temporary));
        assert_eq!(FilesystemKind::from_type(1), Some(FilesystemKind::Persistent));
        assert_eq!(FilesystemKind::from_type(7), None);
    }
}
