use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::api::types::{IndexResult, RepoRecord, RepoStatus};
use crate::api::{ApiError, RepoApi};
use crate::store::RepoStore;
use crate::validate::is_valid_repo_url;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Enter a valid GitHub repo URL: https://github.com/owner/repo")]
    InvalidUrl,
    #[error("The server did not assign a repo id")]
    MissingRepoId,
    #[error("Unknown repo: {0}")]
    UnknownRepo(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Result of an indexing request that passed validation.
#[derive(Debug)]
pub enum IndexOutcome {
    /// The record was not `not_indexed`; nothing was sent.
    Skipped(RepoRecord),
    Indexed { record: RepoRecord, result: IndexResult },
}

/// Registration, indexing and reconciliation of repo records.
pub struct RepoFlow {
    api: Arc<dyn RepoApi>,
    store: Arc<RepoStore>,
}

impl RepoFlow {
    pub fn new(api: Arc<dyn RepoApi>, store: Arc<RepoStore>) -> Self {
        Self { api, store }
    }

    /// Validate, create remotely, then upsert locally.
    pub async fn register(
        &self,
        name: Option<&str>,
        github_url: &str,
    ) -> Result<RepoRecord, FlowError> {
        if !is_valid_repo_url(github_url) {
            return Err(FlowError::InvalidUrl);
        }
        let github_url = github_url.trim();
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let created = self.api.create_repo(name, github_url).await?;
        let repo_id = created
            .repo_id
            .filter(|id| !id.is_empty())
            .ok_or(FlowError::MissingRepoId)?;

        let record = RepoRecord {
            repo_id,
            github_url: created
                .github_url
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| github_url.to_string()),
            name: created.name.or_else(|| name.map(|n| n.to_string())),
            status: created.status.unwrap_or_default(),
        };
        self.store.save_repo(&record).await;

        info!(repo_id = %record.repo_id, url = %record.github_url, status = %record.status, "repo registered");
        Ok(record)
    }

    /// Start indexing `repo_id` if it is `not_indexed`.
    ///
    /// The record is marked `processing` before the request goes out, becomes
    /// `done` on success and falls back to `not_indexed` on failure.
    /// There is no polling; a record left `processing` by a crash stays so.
    pub async fn trigger_index(&self, repo_id: &str) -> Result<IndexOutcome, FlowError> {
        let mut started = false;
        let record = self
            .store
            .modify(repo_id, |r| {
                started = r.status.can_start_indexing();
                if started {
                    r.status = RepoStatus::Processing;
                }
                started
            })
            .await
            .ok_or_else(|| FlowError::UnknownRepo(repo_id.to_string()))?;

        if !started {
            info!(repo_id, status = %record.status, "index request skipped");
            return Ok(IndexOutcome::Skipped(record));
        }
        info!(repo_id, "indexing started");

        match self.api.index_repo(repo_id).await {
            Ok(result) => {
                let record = self.finish(repo_id, RepoStatus::Done).await.unwrap_or(record);
                info!(
                    repo_id,
                    files = ?result.files(),
                    chunks = ?result.chunks(),
                    "indexing done"
                );
                Ok(IndexOutcome::Indexed { record, result })
            }
            Err(e) => {
                self.finish(repo_id, RepoStatus::NotIndexed).await;
                warn!(repo_id, status = ?e.status(), error = %e, "indexing failed");
                Err(e.into())
            }
        }
    }

    async fn finish(&self, repo_id: &str, next: RepoStatus) -> Option<RepoRecord> {
        self.store
            .modify(repo_id, |r| {
                let valid = r.status.can_transition_to(next);
                if valid {
                    r.status = next;
                }
                valid
            })
            .await
    }

    /// Replace the local collection with the server's list.
    pub async fn sync(&self) -> Result<Vec<RepoRecord>, FlowError> {
        let repos = self.api.list_repos().await?;
        self.store.save_repos(&repos).await;
        info!(count = repos.len(), "repos synced from server");
        Ok(repos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{Call, FakeApi};
    use crate::api::types::CreatedRepo;
    use crate::store::memory::MemoryStore;

    fn setup() -> (RepoFlow, Arc<FakeApi>, Arc<RepoStore>) {
        setup_with(FakeApi::new())
    }

    fn setup_with(api: FakeApi) -> (RepoFlow, Arc<FakeApi>, Arc<RepoStore>) {
        let api = Arc::new(api);
        let store = Arc::new(RepoStore::new(Arc::new(MemoryStore::new())));
        (RepoFlow::new(api.clone(), store.clone()), api, store)
    }

    fn created(id: &str, url: &str) -> CreatedRepo {
        CreatedRepo {
            repo_id: Some(id.to_string()),
            github_url: Some(url.to_string()),
            ..CreatedRepo::default()
        }
    }

    async fn seed(store: &RepoStore, id: &str, status: RepoStatus) {
        store
            .save_repo(&RepoRecord {
                repo_id: id.to_string(),
                github_url: format!("https://github.com/acme/{}", id),
                name: None,
                status,
            })
            .await;
    }

    #[tokio::test]
    async fn test_register_persists_not_indexed() {
        let (flow, api, store) = setup();
        api.on_create(Ok(created("r1", "https://github.com/acme/widgets")));

        let record = flow
            .register(None, "https://github.com/acme/widgets")
            .await
            .unwrap();

        assert_eq!(record.repo_id, "r1");
        assert_eq!(record.status, RepoStatus::NotIndexed);
        assert_eq!(store.get_repos().await, vec![record]);
        assert_eq!(
            api.calls(),
            vec![Call::Create {
                name: None,
                github_url: "https://github.com/acme/widgets".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_register_fills_gaps_from_request() {
        let (flow, api, store) = setup();
        api.on_create(Ok(CreatedRepo {
            repo_id: Some("r2".to_string()),
            ..CreatedRepo::default()
        }));

        let record = flow
            .register(Some("  Widgets "), " https://github.com/acme/widgets/ ")
            .await
            .unwrap();

        assert_eq!(record.github_url, "https://github.com/acme/widgets/");
        assert_eq!(record.name.as_deref(), Some("Widgets"));
        assert_eq!(store.get_repo().await, Some(record));
    }

    #[tokio::test]
    async fn test_register_keeps_server_status() {
        let (flow, api, _) = setup();
        let mut reply = created("r3", "https://github.com/acme/widgets");
        reply.status = Some(RepoStatus::Done);
        api.on_create(Ok(reply));

        let record = flow
            .register(Some(""), "https://github.com/acme/widgets")
            .await
            .unwrap();
        assert_eq!(record.status, RepoStatus::Done);
        assert_eq!(record.name, None);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_url_without_network() {
        let (flow, api, store) = setup();

        let err = flow
            .register(None, "https://github.com/acme")
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::InvalidUrl));
        assert!(api.calls().is_empty());
        assert!(store.get_repos().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_without_repo_id_is_not_saved() {
        let (flow, api, store) = setup();
        api.on_create(Ok(CreatedRepo::default()));

        let err = flow
            .register(None, "https://github.com/acme/widgets")
            .await
            .unwrap_err();

        assert!(matches!(err, FlowError::MissingRepoId));
        assert!(store.get_repos().await.is_empty());
    }

    #[tokio::test]
    async fn test_register_surfaces_server_error() {
        let (flow, api, store) = setup();
        api.on_create(Err(ApiError::from_status(400, "github_url is required".into())));

        let err = flow
            .register(None, "https://github.com/acme/widgets")
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "github_url is required");
        assert!(store.get_repos().await.is_empty());
    }

    #[tokio::test]
    async fn test_index_marks_processing_before_response_then_done() {
        let (flow, api, store) = setup_with(FakeApi::gated());
        let flow = Arc::new(flow);
        seed(&store, "r1", RepoStatus::NotIndexed).await;
        api.on_index(Ok(serde_json::from_str(r#"{"files_indexed":2,"chunks_indexed":9}"#).unwrap()));

        let task = tokio::spawn({
            let flow = flow.clone();
            async move { flow.trigger_index("r1").await }
        });
        while api.calls().is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.find("r1").await.unwrap().status, RepoStatus::Processing);

        api.release();
        let outcome = task.await.unwrap().unwrap();
        match outcome {
            IndexOutcome::Indexed { record, result } => {
                assert_eq!(record.status, RepoStatus::Done);
                assert_eq!(result.files(), Some(2));
                assert_eq!(result.chunks(), Some(9));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.find("r1").await.unwrap().status, RepoStatus::Done);
    }

    #[tokio::test]
    async fn test_index_failure_reverts_to_not_indexed() {
        let (flow, api, store) = setup();
        seed(&store, "r1", RepoStatus::NotIndexed).await;
        api.on_index(Err(ApiError::from_status(500, "OPENAI_API_KEY is required".into())));

        let err = flow.trigger_index("r1").await.unwrap_err();

        assert_eq!(err.to_string(), "OPENAI_API_KEY is required");
        assert_eq!(store.find("r1").await.unwrap().status, RepoStatus::NotIndexed);

        // Retry is a fresh action and goes through.
        api.on_index(Ok(IndexResult::default()));
        let outcome = flow.trigger_index("r1").await.unwrap();
        assert!(matches!(outcome, IndexOutcome::Indexed { .. }));
        assert_eq!(api.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_index_on_processing_or_done_is_noop() {
        let (flow, api, store) = setup();
        seed(&store, "busy", RepoStatus::Processing).await;
        seed(&store, "ready", RepoStatus::Done).await;

        for id in ["busy", "ready"] {
            let outcome = flow.trigger_index(id).await.unwrap();
            assert!(matches!(outcome, IndexOutcome::Skipped(_)));
        }
        assert!(api.calls().is_empty());
        assert_eq!(store.find("busy").await.unwrap().status, RepoStatus::Processing);
        assert_eq!(store.find("ready").await.unwrap().status, RepoStatus::Done);
    }

    #[tokio::test]
    async fn test_concurrent_index_requests_send_once() {
        let (flow, api, store) = setup_with(FakeApi::gated());
        let flow = Arc::new(flow);
        seed(&store, "r1", RepoStatus::NotIndexed).await;
        api.on_index(Ok(IndexResult::default()));

        let first = tokio::spawn({
            let flow = flow.clone();
            async move { flow.trigger_index("r1").await }
        });
        while api.calls().is_empty() {
            tokio::task::yield_now().await;
        }

        let second = flow.trigger_index("r1").await.unwrap();
        assert!(matches!(second, IndexOutcome::Skipped(ref r) if r.status == RepoStatus::Processing));

        api.release();
        first.await.unwrap().unwrap();
        assert_eq!(api.calls(), vec![Call::Index("r1".to_string())]);
    }

    #[tokio::test]
    async fn test_index_unknown_repo() {
        let (flow, api, _) = setup();
        let err = flow.trigger_index("ghost").await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownRepo(ref id) if id == "ghost"));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_sync_replaces_local_collection() {
        let (flow, api, store) = setup();
        seed(&store, "local", RepoStatus::Done).await;
        let server: Vec<RepoRecord> = serde_json::from_str(
            r#"[{"repo_id":"a","github_url":"https://github.com/o/a","status":"done"},
                {"repo_id":"b","github_url":"https://github.com/o/b"}]"#,
        )
        .unwrap();
        api.on_list(Ok(server.clone()));

        let synced = flow.sync().await.unwrap();

        assert_eq!(synced, server);
        assert_eq!(store.get_repos().await, server);
    }

    #[tokio::test]
    async fn test_sync_failure_keeps_local_collection() {
        let (flow, api, store) = setup();
        seed(&store, "local", RepoStatus::Done).await;
        api.on_list(Err(ApiError::Configuration("CODEDOC_API_BASE_URL".into())));

        assert!(flow.sync().await.is_err());
        assert_eq!(store.get_repos().await.len(), 1);
    }
}
