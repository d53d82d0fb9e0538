use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use cnidarium::{StateDelta, StateRead, StateWrite, Storage};
use tracing::debug;

/// Raw byte key/value storage backing `RepoStore`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// On-disk storage under the bot's data directory.
pub struct CnidariumStore {
    storage: Storage,
}

impl CnidariumStore {
    pub async fn open(data_dir: &Path, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let storage = Storage::load(data_dir.to_path_buf(), vec![prefix.to_string()])
            .await
            .context("Failed to init cnidarium storage")?;
        Ok(Self { storage })
    }
}

#[async_trait]
impl KeyValueStore for CnidariumStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let snapshot = self.storage.latest_snapshot();
        snapshot.get_raw(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let size = value.len();
        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        delta.put_raw(key.to_string(), value);
        self.storage.commit(delta).await?;
        debug!(key, size, "committed");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut delta = StateDelta::new(self.storage.latest_snapshot());
        delta.delete(key.to_string());
        self.storage.commit(delta).await?;
        debug!(key, "deleted");
        Ok(())
    }
}
