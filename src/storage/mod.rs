use crate::error::Result;
use async_trait::async_trait;

pub mod memory;

#[cfg(feature = "file-storage")]
pub mod file_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

pub use memory::MemoryMedium;

#[cfg(feature = "file-storage")]
pub use file_storage::FileMedium;

#[cfg(feature = "sqlite-storage")]
pub use sqlite_storage::SqliteMedium;

/// Durable keyed blob storage backing the entity stores.
///
/// Each store owns one key and writes its full serialized set on every
/// mutation, so implementations only need whole-value reads and writes.
#[async_trait]
pub trait DurableMedium: Send + Sync {
    /// Reads the blob stored under `key`; `None` when the key was never written
    async fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the blob under `key`
    async fn write(&self, key: &str, blob: &str) -> Result<()>;

    /// Removes `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> Result<()>;
}
