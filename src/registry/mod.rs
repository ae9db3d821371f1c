//! Server registry: which servers are monitored and what was last observed
//!
//! The registry is an ordered map from server name to [`ServerEntry`]. It is loaded
//! once at startup, mutated in place by the monitor after every successful probe,
//! and written back in full once per cycle through a [`RegistryStore`].
//!
//! ## Stores
//!
//! - **JsonFileStore**: the `servers.json` file shared with the optimizer tooling
//! - **MemoryStore**: keeps the registry in memory, for tests and dry runs

pub mod entry;
pub mod error;
pub mod file;
pub mod memory;
pub mod store;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use entry::ServerEntry;
pub use error::{RegistryError, RegistryResult};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use store::RegistryStore;

/// A server the monitor should probe this cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    servers: BTreeMap<String, ServerEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: ServerEntry) -> Option<ServerEntry> {
        self.servers.insert(name.into(), entry)
    }

    pub fn get(&self, name: &str) -> Option<&ServerEntry> {
        self.servers.get(name)
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ServerEntry)> {
        self.servers.iter()
    }

    /// Servers with `AutoOptimize` set, in name order.
    pub fn probe_targets(&self) -> Vec<ProbeTarget> {
        self.servers
            .iter()
            .filter(|(_, entry)| entry.auto_optimize)
            .map(|(name, entry)| ProbeTarget {
                name: name.clone(),
                address: entry.address.clone(),
            })
            .collect()
    }

    /// Store a successful latency sample for `name`.
    pub fn record_sample(
        &mut self,
        name: &str,
        latency_ms: f64,
        at: DateTime<Utc>,
    ) -> RegistryResult<()> {
        if !latency_ms.is_finite() || latency_ms < 0.0 {
            return Err(RegistryError::InvalidSample(latency_ms));
        }

        let entry = self
            .servers
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownServer(name.to_string()))?;

        entry.current_latency = Some(latency_ms);
        entry.last_check = Some(at);
        Ok(())
    }

    /// Serialize as the human-readable on-disk form (2-space indentation).
    pub fn to_json_pretty(&self) -> RegistryResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(raw: &str) -> RegistryResult<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl FromIterator<(String, ServerEntry)> for Registry {
    fn from_iter<I: IntoIterator<Item = (String, ServerEntry)>>(iter: I) -> Self {
        Self {
            servers: iter.into_iter().collect(),
        }
    }
}
