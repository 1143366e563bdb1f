use crate::{
    error::{Result, ShopError},
    storage::DurableMedium,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::{path::Path, sync::Mutex};

/// SQLite-backed medium storing every key in a single `kv` table
pub struct SqliteMedium {
    connection: Mutex<Connection>,
}

fn storage_error(err: rusqlite::Error) -> ShopError {
    ShopError::StorageError(err.to_string())
}

impl SqliteMedium {
    /// Opens (or creates) the database file
    pub fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        let connection = Connection::open(database_path).map_err(storage_error)?;
        Self::with_connection(connection)
    }

    pub fn in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().map_err(storage_error)?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self> {
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY NOT NULL, value TEXT NOT NULL)",
                [],
            )
            .map_err(storage_error)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.connection
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl DurableMedium for SqliteMedium {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        self.lock()
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(storage_error)
    }

    async fn write(&self, key: &str, blob: &str) -> Result<()> {
        self.lock()
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, blob],
            )
            .map_err(storage_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.lock()
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(storage_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_upsert_and_delete() {
        let medium = SqliteMedium::in_memory().unwrap();

        assert_eq!(medium.read("k").await.unwrap(), None);
        medium.write("k", "[1]").await.unwrap();
        medium.write("k", "[2]").await.unwrap();
        assert_eq!(medium.read("k").await.unwrap().as_deref(), Some("[2]"));

        medium.delete("k").await.unwrap();
        assert_eq!(medium.read("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("shop.db");

        {
            let medium = SqliteMedium::open(&path).unwrap();
            medium.write("shopfloor_leads", "[]").await.unwrap();
        }

        let medium = SqliteMedium::open(&path).unwrap();
        assert_eq!(
            medium.read("shopfloor_leads").await.unwrap().as_deref(),
            Some("[]")
        );
    }
}
