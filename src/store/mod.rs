pub mod backend;
#[cfg(test)]
pub mod memory;

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::api::types::RepoRecord;
use backend::{CnidariumStore, KeyValueStore};

/// Substore prefix for every key this bot writes.
pub const STORE_PREFIX: &str = "codedoc";
/// List-format entry: the full collection, most recent first.
pub const REPOS_KEY: &str = "codedoc/repos";
/// Legacy single-record entry: the last record passed to `save_repo`.
pub const LEGACY_REPO_KEY: &str = "codedoc/repo";

/// Local collection of registered repositories.
///
/// Persisted state is advisory: malformed or unreadable entries read as
/// empty and failed writes are logged, never returned to callers.
pub struct RepoStore {
    backend: Option<Arc<dyn KeyValueStore>>,
    /// Serialises collection reads (which may migrate) and read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl RepoStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backend: Some(backend),
            write_lock: Mutex::new(()),
        }
    }

    /// A store with nowhere to persist: reads are empty and writes are dropped.
    pub fn detached() -> Self {
        Self {
            backend: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Open the on-disk store, falling back to a detached one if it cannot be loaded.
    pub async fn open_or_detached(data_dir: &Path) -> Self {
        match CnidariumStore::open(data_dir, STORE_PREFIX).await {
            Ok(backend) => Self::new(Arc::new(backend)),
            Err(e) => {
                warn!(error = %e, dir = %data_dir.display(), "repo store unavailable, running without persistence");
                Self::detached()
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    /// All records, most recent first. Migrates a legacy single record into
    /// the list format the first time it is read.
    pub async fn get_repos(&self) -> Vec<RepoRecord> {
        let Some(backend) = &self.backend else {
            return Vec::new();
        };
        let _guard = self.write_lock.lock().await;
        load(backend.as_ref()).await
    }

    /// The most recently saved record.
    pub async fn get_repo(&self) -> Option<RepoRecord> {
        self.get_repos().await.into_iter().next()
    }

    pub async fn find(&self, repo_id: &str) -> Option<RepoRecord> {
        self.get_repos()
            .await
            .into_iter()
            .find(|r| r.repo_id == repo_id)
    }

    /// Resolve a user-supplied reference: repo id, then GitHub URL (ignoring
    /// a trailing slash and case), then display name.
    pub async fn resolve(&self, reference: &str) -> Option<RepoRecord> {
        let reference = reference.trim();
        let repos = self.get_repos().await;
        let url = reference.trim_end_matches('/');

        if let Some(r) = repos.iter().find(|r| r.repo_id == reference) {
            return Some(r.clone());
        }
        if let Some(r) = repos
            .iter()
            .find(|r| r.github_url.trim_end_matches('/').eq_ignore_ascii_case(url))
        {
            return Some(r.clone());
        }
        repos
            .into_iter()
            .find(|r| r.name.as_deref().map(str::trim) == Some(reference))
    }

    /// Upsert by `repo_id`: replace in place if present, else prepend.
    /// Also refreshes the legacy single-record entry.
    pub async fn save_repo(&self, record: &RepoRecord) {
        let Some(backend) = &self.backend else {
            return;
        };
        let _guard = self.write_lock.lock().await;
        let mut repos = load(backend.as_ref()).await;
        upsert(&mut repos, record.clone());
        persist(backend.as_ref(), &repos, record).await;
    }

    /// Replace the whole collection, e.g. with the server's view.
    pub async fn save_repos(&self, records: &[RepoRecord]) {
        let Some(backend) = &self.backend else {
            return;
        };
        let _guard = self.write_lock.lock().await;
        write_json(backend.as_ref(), REPOS_KEY, records).await;
    }

    /// Apply `f` to the record with `repo_id` under the write lock, persisting
    /// it when `f` returns true. Returns the record as it stands afterwards.
    ///
    /// A detached store has no records, so this always returns `None` there.
    pub async fn modify<F>(&self, repo_id: &str, f: F) -> Option<RepoRecord>
    where
        F: FnOnce(&mut RepoRecord) -> bool,
    {
        let backend = self.backend.as_ref()?;
        let _guard = self.write_lock.lock().await;
        let mut repos = load(backend.as_ref()).await;
        let idx = repos.iter().position(|r| r.repo_id == repo_id)?;
        if f(&mut repos[idx]) {
            let record = repos[idx].clone();
            persist(backend.as_ref(), &repos, &record).await;
        }
        Some(repos.swap_remove(idx))
    }

    /// Remove the legacy single-record entry. The collection is untouched.
    pub async fn clear_repo(&self) {
        let Some(backend) = &self.backend else {
            return;
        };
        let _guard = self.write_lock.lock().await;
        if let Err(e) = backend.remove(LEGACY_REPO_KEY).await {
            warn!(error = %e, "failed to clear legacy repo entry");
        }
    }
}

/// Read the list entry, falling back to a one-time migration of the legacy entry.
async fn load(backend: &dyn KeyValueStore) -> Vec<RepoRecord> {
    match backend.get(REPOS_KEY).await {
        Ok(Some(bytes)) => {
            return serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(error = %e, "malformed repo list in store, ignoring");
                Vec::new()
            });
        }
        Ok(None) => {}
        Err(e) => {
            warn!(error = %e, "failed to read repo list");
            return Vec::new();
        }
    }

    migrate_legacy(backend).await
}

async fn migrate_legacy(backend: &dyn KeyValueStore) -> Vec<RepoRecord> {
    let bytes = match backend.get(LEGACY_REPO_KEY).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, "failed to read legacy repo entry");
            return Vec::new();
        }
    };
    let record: RepoRecord = match serde_json::from_slice(&bytes) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "malformed legacy repo entry, ignoring");
            return Vec::new();
        }
    };

    let repos = vec![record];
    write_json(backend, REPOS_KEY, &repos).await;
    debug!(repo_id = %repos[0].repo_id, "migrated legacy repo entry");
    repos
}

fn upsert(repos: &mut Vec<RepoRecord>, record: RepoRecord) {
    match repos.iter_mut().find(|r| r.repo_id == record.repo_id) {
        Some(existing) => *existing = record,
        None => repos.insert(0, record),
    }
}

async fn persist(backend: &dyn KeyValueStore, repos: &[RepoRecord], latest: &RepoRecord) {
    write_json(backend, REPOS_KEY, repos).await;
    write_json(backend, LEGACY_REPO_KEY, latest).await;
}

async fn write_json<T: serde::Serialize + ?Sized>(backend: &dyn KeyValueStore, key: &str, value: &T) {
    let bytes = match serde_json::to_vec(value) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key, error = %e, "failed to serialize store entry");
            return;
        }
    };
    if let Err(e) = backend.put(key, bytes).await {
        warn!(key, error = %e, "failed to write store entry");
    }
}
