//! JSON file store
//!
//! The registry file is rewritten in full every cycle. Writes go to a sibling
//! temporary file first and are then renamed over the target, so readers never
//! observe a half-written registry.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, trace};

use super::Registry;
use super::error::RegistryResult;
use super::store::RegistryStore;

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RegistryStore for JsonFileStore {
    async fn load(&self) -> RegistryResult<Registry> {
        trace!("reading registry from {}", self.path.display());
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let registry = Registry::from_json(&raw)?;
        debug!(
            "loaded {} servers from {}",
            registry.len(),
            self.path.display()
        );
        Ok(registry)
    }

    async fn save(&self, registry: &Registry) -> RegistryResult<()> {
        let json = registry.to_json_pretty()?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        tokio::fs::write(&temp_path, json).await?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        trace!("saved {} servers to {}", registry.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
