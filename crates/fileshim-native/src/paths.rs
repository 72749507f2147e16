//! Root directory discovery for the host, based on the platform's standard
//! locations (XDG on Linux, Known Folders on Windows, `~/Library` on macOS).

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::{ProjectDirs, UserDirs};
use fileshim_platform::paths::{PathProvider, RootPaths};

/// Explicit per-root paths that take precedence over discovery.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub application: Option<PathBuf>,
    pub data: Option<PathBuf>,
    pub documents: Option<PathBuf>,
    pub cache: Option<PathBuf>,
    pub temp: Option<PathBuf>,
}

pub struct HostPathProvider {
    qualifier: String,
    organization: String,
    application: String,
    overrides: PathOverrides,
}

impl HostPathProvider {
    pub fn new(qualifier: &str, organization: &str, application: &str) -> Self {
        Self {
            qualifier: qualifier.to_string(),
            organization: organization.to_string(),
            application: application.to_string(),
            overrides: PathOverrides::default(),
        }
    }

    pub fn with_overrides(mut self, overrides: PathOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    fn project_dirs(&self) -> Option<ProjectDirs> {
        ProjectDirs::from(&self.qualifier, &self.organization, &self.application)
    }
}

impl PathProvider for HostPathProvider {
    fn root_paths(&self) -> Result<RootPaths> {
        let project = self.project_dirs();

        let data = match &self.overrides.data {
            Some(p) => p.clone(),
            None => project
                .as_ref()
                .map(|d| d.data_dir().to_path_buf())
                .context("no data directory for this platform")?,
        };

        let cache = match &self.overrides.cache {
            Some(p) => p.clone(),
            None => project
                .as_ref()
                .map(|d| d.cache_dir().to_path_buf())
                .context("no cache directory for this platform")?,
        };

        let documents = match &self.overrides.documents {
            Some(p) => p.clone(),
            None => UserDirs::new()
                .map(|u| {
                    u.document_dir()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| u.home_dir().join("Documents"))
                })
                .context("no home directory for this platform")?,
        };

        let temp = self
            .overrides
            .temp
            .clone()
            .unwrap_or_else(std::env::temp_dir);

        let application = match &self.overrides.application {
            Some(p) => p.clone(),
            None => std::env::current_exe()
                .context("failed to get current exe path")?
                .parent()
                .map(Path::to_path_buf)
                .context("executable has no parent directory")?,
        };

        let roots = RootPaths {
            application,
            data,
            documents,
            cache,
            temp,
        };

        for (name, path) in [
            ("application", &roots.application),
            ("data", &roots.data),
            ("documents", &roots.documents),
            ("cache", &roots.cache),
            ("temp", &roots.temp),
        ] {
            if !path.is_absolute() {
                bail!("{} directory is not absolute: {}", name, path.display());
            }
        }

        tracing::debug!(?roots, "resolved root paths");
        Ok(roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_overrides(base: &Path) -> PathOverrides {
        PathOverrides {
            application: Some(base.join("app")),
            data: Some(base.join("data")),
            documents: Some(base.join("docs")),
            cache: Some(base.join("cache")),
            temp: Some(base.join("tmp")),
        }
    }

    #[test]
    fn test_overrides_win() {
        let base = std::env::temp_dir();
        let provider = HostPathProvider::new("org", "example", "fileshim")
            .with_overrides(all_overrides(&base));

        let roots = provider.root_paths().unwrap();
        assert_eq!(roots.application, base.join("app"));
        assert_eq!(roots.data, base.join("data"));
        assert_eq!(roots.documents, base.join("docs"));
        assert_eq!(roots.cache, base.join("cache"));
        assert_eq!(roots.temp, base.join("tmp"));
    }

    #[test]
    fn test_relative_override_rejected() {
        let base = std::env::temp_dir();
        let mut overrides = all_overrides(&base);
        overrides.cache = Some(PathBuf::from("relative/cache"));

        let provider =
            HostPathProvider::new("org", "example", "fileshim").with_overrides(overrides);
        let err = provider.root_paths().unwrap_err();
        assert!(err.to_string().contains("cache"));
    }
}
