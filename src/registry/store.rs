//! Registry store trait definition

use std::sync::Arc;

use async_trait::async_trait;

use super::Registry;
use super::error::RegistryResult;

/// Trait for places the registry is persisted to
///
/// `save` always writes the complete registry; there are no partial updates.
/// Implementations must be `Send + Sync` so the monitor can hold them across
/// await points.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Read the persisted registry.
    async fn load(&self) -> RegistryResult<Registry>;

    /// Replace the persisted registry with `registry`.
    async fn save(&self, registry: &Registry) -> RegistryResult<()>;

    /// Human-readable location for log lines.
    fn describe(&self) -> String;
}

#[async_trait]
impl<T: RegistryStore + ?Sized> RegistryStore for Arc<T> {
    async fn load(&self) -> RegistryResult<Registry> {
        (**self).load().await
    }

    async fn save(&self, registry: &Registry) -> RegistryResult<()> {
        (**self).save(registry).await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
