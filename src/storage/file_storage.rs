use crate::{
    error::{Result, ShopError},
    storage::DurableMedium,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File-based medium: one JSON file per key under `<root>/.shopfloor/`
pub struct FileMedium {
    root_path: PathBuf,
}

impl FileMedium {
    const DATA_DIR: &'static str = ".shopfloor";

    /// Creates a new FileMedium for the given data root
    pub fn new(data_root: impl AsRef<Path>) -> Self {
        Self {
            root_path: data_root.as_ref().join(Self::DATA_DIR),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn key_file(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
            && !key.starts_with('.');
        if !valid {
            return Err(ShopError::StorageError(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root_path.join(format!("{}.json", key)))
    }

    async fn ensure_directory_exists(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DurableMedium for FileMedium {
    async fn read(&self, key: &str) -> Result<Option<String>> {
        let file_path = self.key_file(key)?;

        if !file_path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&file_path).await?;
        Ok(Some(contents))
    }

    async fn write(&self, key: &str, blob: &str) -> Result<()> {
        self.ensure_directory_exists(&self.root_path).await?;

        // Write to a sibling temp file, then rename over the target
        let file_path = self.key_file(key)?;
        let tmp_path = file_path.with_extension("json.tmp");
        fs::write(&tmp_path, blob).await?;
        fs::rename(&tmp_path, &file_path).await?;

        tracing::debug!(key, path = %file_path.display(), "wrote blob");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let file_path = self.key_file(key)?;

        if file_path.exists() {
            fs::remove_file(file_path).await?;
        }
        Ok(())
    }
}
