use crate::{
    error::{Result, ShopError},
    storage::DurableMedium,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

/// In-process medium, used by tests and by embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryMedium {
    entries: Mutex<HashMap<String, String>>,
    simulate_write_error: AtomicBool,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `write`/`delete` fail, for error-path tests
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Raw access for tests that corrupt or inspect stored blobs
    pub fn insert_raw(&self, key: impl Into<String>, blob: impl Into<String>) {
        self.lock().insert(key.into(), blob.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_writable(&self) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(ShopError::StorageError("Simulated write error".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DurableMedium for MemoryMedium {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock().get(key).cloned())
    }

    async fn write(&self, key: &str, blob: &str) -> Result<()> {
        self.check_writable()?;
        self.lock().insert(key.to_string(), blob.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_writable()?;
        self.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_write_delete() {
        let medium = MemoryMedium::new();
        assert_eq!(medium.read("k").await.unwrap(), None);

        medium.write("k", "[]").await.unwrap();
        assert_eq!(medium.read("k").await.unwrap().as_deref(), Some("[]"));

        medium.delete("k").await.unwrap();
        assert_eq!(medium.read("k").await.unwrap(), None);

        // Absent key
        medium.delete("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_simulated_write_error() {
        let medium = MemoryMedium::new();
        medium.write("k", "[1]").await.unwrap();
        medium.set_simulate_write_error(true);

        assert!(matches!(
            medium.write("k", "[2]").await,
            Err(ShopError::StorageError(_))
        ));
        assert_eq!(medium.read("k").await.unwrap().as_deref(), Some("[1]"));
    }
}
