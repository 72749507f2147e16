use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShimConfig {
    /// Reverse-domain qualifier used to locate platform directories (e.g., "org")
    #[serde(default = "default_qualifier")]
    pub qualifier: String,

    #[serde(default = "default_organization")]
    pub organization: String,

    /// Application name; the data and cache roots live in per-app directories
    #[serde(default = "default_app_name")]
    pub app_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub application_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,
}

fn default_qualifier() -> String {
    "org".to_string()
}
fn default_organization() -> String {
    "fileshim".to_string()
}
fn default_app_name() -> String {
    "fileshim".to_string()
}

impl Default for ShimConfig {
    fn default() -> Self {
        Self {
            qualifier: default_qualifier(),
            organization: default_organization(),
            app_name: default_app_name(),
            application_dir: None,
            data_dir: None,
            documents_dir: None,
            cache_dir: None,
            temp_dir: None,
        }
    }
}

impl ShimConfig {
    /// Default config file path for this platform
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("org", "fileshim", "fileshim") {
            dirs.config_dir().join("config.json")
        } else {
            PathBuf::from("fileshim-config.json")
        }
    }

    /// Load config from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self =
            serde_json::from_str(&data).with_context(|| "failed to parse config JSON")?;
        Ok(config)
    }

    /// Save config to a file path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: ShimConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ShimConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");

        let config = ShimConfig {
            app_name: "notes".to_string(),
            data_dir: Some(PathBuf::from("/srv/notes")),
            ..ShimConfig::default()
        };
        config.save(&path).unwrap();

        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(!saved.contains("cache_dir"), "unset overrides are omitted");

        assert_eq!(ShimConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let temp = TempDir::new().unwrap();
        let err = ShimConfig::load(&temp.path().join("absent.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read config"));
    }
}
