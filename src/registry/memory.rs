//! In-memory registry store (no persistence)
//!
//! Useful for tests and for dry runs where the registry file must not be touched.
//! A store can be switched into a failing mode to exercise save-error handling.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::Registry;
use super::error::{RegistryError, RegistryResult};
use super::store::RegistryStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    registry: Mutex<Option<Registry>>,
    save_count: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    /// An empty store; `load` fails until something was saved.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry: Mutex::new(Some(registry)),
            ..Self::default()
        }
    }

    /// Make every following `save` fail with an I/O error.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }

    /// The last saved (or initial) registry.
    pub fn snapshot(&self) -> Option<Registry> {
        self.registry.lock().ok().and_then(|guard| guard.clone())
    }
}

fn unavailable(message: &str) -> RegistryError {
    RegistryError::IoError(std::io::Error::other(message.to_string()))
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn load(&self) -> RegistryResult<Registry> {
        let guard = self
            .registry
            .lock()
            .map_err(|_| unavailable("memory store poisoned"))?;
        guard
            .clone()
            .ok_or_else(|| unavailable("nothing stored in memory store"))
    }

    async fn save(&self, registry: &Registry) -> RegistryResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(unavailable("memory store configured to fail"));
        }

        let mut guard = self
            .registry
            .lock()
            .map_err(|_| unavailable("memory store poisoned"))?;
        *guard = Some(registry.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        debug!("in-memory store: saved {} servers", registry.len());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
