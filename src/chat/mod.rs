pub mod citations;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::types::{ChatSource, RepoId, RepoRecord, RepoStatus};
use crate::api::{ApiError, RepoApi};
use citations::strip_sources_block;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub sources: Vec<ChatSource>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<ChatSource>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sources,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Ask a question first.")]
    EmptyQuestion,
    #[error("Still waiting for the previous answer.")]
    Busy,
    #[error("Repo is not indexed yet. Current status: {0}")]
    NotIndexed(RepoStatus),
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// The conversation shown in one channel. Messages only ever get appended.
#[derive(Debug)]
struct ChatSession {
    id: u64,
    repo_id: RepoId,
    messages: Vec<ChatMessage>,
    in_flight: bool,
}

/// Per-channel chat sessions against the remote API.
///
/// A channel has at most one request outstanding, whichever repo it targets.
/// A session lives until it is cleared or the channel switches repo. A reply
/// that arrives after a clear is dropped instead of landing in a new session.
pub struct ChatFlow {
    api: Arc<dyn RepoApi>,
    sessions: Mutex<HashMap<u64, ChatSession>>,
    next_id: AtomicU64,
}

impl ChatFlow {
    pub fn new(api: Arc<dyn RepoApi>) -> Self {
        Self {
            api,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Ask `question` about `repo` in `channel`.
    ///
    /// The user message is appended before the request is sent and stays on
    /// failure. On success the assistant message is appended and returned.
    pub async fn send(
        &self,
        channel: u64,
        repo: &RepoRecord,
        question: &str,
    ) -> Result<ChatMessage, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }
        if repo.status != RepoStatus::Done {
            return Err(ChatError::NotIndexed(repo.status));
        }

        let session_id = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions
                .entry(channel)
                .or_insert_with(|| self.new_session(&repo.repo_id));
            if session.in_flight {
                return Err(ChatError::Busy);
            }
            if session.repo_id != repo.repo_id {
                *session = self.new_session(&repo.repo_id);
            }
            session.in_flight = true;
            session.messages.push(ChatMessage::user(question));
            session.id
        };
        info!(channel, repo_id = %repo.repo_id, "chat question sent");

        let result = self.api.chat(&repo.repo_id, question).await;

        let mut sessions = self.sessions.lock().await;
        let session = sessions.get_mut(&channel).filter(|s| s.id == session_id);
        if let Some(session) = &session {
            debug!(channel, messages = session.messages.len(), "chat reply received");
        }

        match result {
            Ok(resp) => {
                let message = ChatMessage::assistant(
                    strip_sources_block(&resp.answer),
                    resp.sources.unwrap_or_default(),
                );
                match session {
                    Some(session) => {
                        session.in_flight = false;
                        session.messages.push(message.clone());
                    }
                    None => debug!(channel, "chat session gone, reply not recorded"),
                }
                Ok(message)
            }
            Err(e) => {
                if let Some(session) = session {
                    session.in_flight = false;
                }
                warn!(
                    channel,
                    repo_id = %repo.repo_id,
                    status = ?e.status(),
                    error = %e,
                    "chat request failed"
                );
                Err(e.into())
            }
        }
    }

    /// Transcript for `channel`, oldest first.
    pub async fn history(&self, channel: u64) -> Option<(RepoId, Vec<ChatMessage>)> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&channel)
            .map(|s| (s.repo_id.clone(), s.messages.clone()))
    }

    /// Drop the session for `channel`. Returns whether one existed.
    pub async fn clear(&self, channel: u64) -> bool {
        self.sessions.lock().await.remove(&channel).is_some()
    }

    fn new_session(&self, repo_id: &str) -> ChatSession {
        ChatSession {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            repo_id: repo_id.to_string(),
            messages: Vec::new(),
            in_flight: false,
        }
    }
}
