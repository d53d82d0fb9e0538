use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned repository identifier.
pub type RepoId = String;

/// Indexing status of a registered repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoStatus {
    #[default]
    NotIndexed,
    Processing,
    Done,
}

impl RepoStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RepoStatus::NotIndexed => "not_indexed",
            RepoStatus::Processing => "processing",
            RepoStatus::Done => "done",
        }
    }

    /// Indexing may only be started from `not_indexed`.
    pub fn can_start_indexing(self) -> bool {
        self == RepoStatus::NotIndexed
    }

    /// `not_indexed -> processing -> done`, plus the `processing -> not_indexed` rollback.
    pub fn can_transition_to(self, next: RepoStatus) -> bool {
        matches!(
            (self, next),
            (RepoStatus::NotIndexed, RepoStatus::Processing)
                | (RepoStatus::Processing, RepoStatus::Done)
                | (RepoStatus::Processing, RepoStatus::NotIndexed)
        )
    }
}

impl fmt::Display for RepoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Missing, null and unrecognised values all read as `not_indexed`.
impl<'de> Deserialize<'de> for RepoStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some("processing") => RepoStatus::Processing,
            Some("done") => RepoStatus::Done,
            _ => RepoStatus::NotIndexed,
        })
    }
}

/// A registered repository as persisted locally and reported by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoRecord {
    pub repo_id: RepoId,
    pub github_url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: RepoStatus,
}

impl RepoRecord {
    /// Display label: the user-supplied name, else the GitHub URL.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.github_url)
    }
}

/// Body returned by `POST /repos`. Every field is optional so an empty or
/// partial reply still parses; the registration flow fills the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatedRepo {
    #[serde(default)]
    pub repo_id: Option<RepoId>,
    #[serde(default)]
    pub github_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<RepoStatus>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRepoRequest<'a> {
    pub name: Option<&'a str>,
    pub github_url: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest<'a> {
    pub question: &'a str,
}

/// Counters reported by `POST /repos/{id}/index`.
///
/// Servers use either `files_indexed`/`chunks_indexed` or `files`/`chunks`;
/// non-numeric values are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IndexResult {
    #[serde(default, deserialize_with = "lenient_count")]
    pub files_indexed: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub files: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub chunks_indexed: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub chunks: Option<u64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl IndexResult {
    pub fn files(&self) -> Option<u64> {
        self.files_indexed.or(self.files)
    }

    pub fn chunks(&self) -> Option<u64> {
        self.chunks_indexed.or(self.chunks)
    }
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_u64())
}

/// A file/line citation attached to a chat answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSource {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<ChatSource>>,
}
