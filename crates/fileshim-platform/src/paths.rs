use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Absolute base paths for each symbolic root, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootPaths {
    pub application: PathBuf,
    pub data: PathBuf,
    pub documents: PathBuf,
    pub cache: PathBuf,
    pub temp: PathBuf,
}

pub trait PathProvider: Send + Sync {
    /// Resolve the root directories. Called once at startup.
    fn root_paths(&self) -> Result<RootPaths>;
}
