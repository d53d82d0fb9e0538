//! Recording in-process `RepoApi` for flow tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::types::{ChatResponse, CreatedRepo, IndexResult, RepoRecord};
use super::{ApiError, ApiResult, RepoApi};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create { name: Option<String>, github_url: String },
    List,
    Index(String),
    Chat { repo_id: String, question: String },
}

/// Replies are queued per operation and popped in order; an empty queue
/// answers with a 500.
#[derive(Default)]
pub struct FakeApi {
    pub calls: Mutex<Vec<Call>>,
    create: Mutex<VecDeque<ApiResult<CreatedRepo>>>,
    list: Mutex<VecDeque<ApiResult<Vec<RepoRecord>>>>,
    index: Mutex<VecDeque<ApiResult<IndexResult>>>,
    chat: Mutex<VecDeque<ApiResult<ChatResponse>>>,
    /// When set, `index_repo` and `chat` wait for a notification before replying.
    pub gate: Option<Notify>,
}

fn unqueued<T>() -> ApiResult<T> {
    Err(ApiError::from_status(500, String::new()))
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub fn on_create(&self, reply: ApiResult<CreatedRepo>) {
        self.create.lock().unwrap().push_back(reply);
    }

    pub fn on_list(&self, reply: ApiResult<Vec<RepoRecord>>) {
        self.list.lock().unwrap().push_back(reply);
    }

    pub fn on_index(&self, reply: ApiResult<IndexResult>) {
        self.index.lock().unwrap().push_back(reply);
    }

    pub fn on_chat(&self, reply: ApiResult<ChatResponse>) {
        self.chat.lock().unwrap().push_back(reply);
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
    }
}

#[async_trait]
impl RepoApi for FakeApi {
    async fn create_repo(&self, name: Option<&str>, github_url: &str) -> ApiResult<CreatedRepo> {
        self.calls.lock().unwrap().push(Call::Create {
            name: name.map(|s| s.to_string()),
            github_url: github_url.to_string(),
        });
        let reply = self.create.lock().unwrap().pop_front();
        reply.unwrap_or_else(unqueued)
    }

    async fn list_repos(&self) -> ApiResult<Vec<RepoRecord>> {
        self.calls.lock().unwrap().push(Call::List);
        let reply = self.list.lock().unwrap().pop_front();
        reply.unwrap_or_else(unqueued)
    }

    async fn index_repo(&self, repo_id: &str) -> ApiResult<IndexResult> {
        self.calls.lock().unwrap().push(Call::Index(repo_id.to_string()));
        self.wait_gate().await;
        let reply = self.index.lock().unwrap().pop_front();
        reply.unwrap_or_else(unqueued)
    }

    async fn chat(&self, repo_id: &str, question: &str) -> ApiResult<ChatResponse> {
        self.calls.lock().unwrap().push(Call::Chat {
            repo_id: repo_id.to_string(),
            question: question.to_string(),
        });
        self.wait_gate().await;
        let reply = self.chat.lock().unwrap().pop_front();
        reply.unwrap_or_else(unqueued)
    }
}
