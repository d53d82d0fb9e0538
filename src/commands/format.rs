use crate::api::types::{IndexResult, RepoRecord};
use crate::chat::citations::{format_source, unique_sources};
use crate::chat::{ChatMessage, Role};

/// Split `text` into pieces of at most `max` bytes, preferring to break
/// after a newline, then after a space.
pub fn chunks(text: &str, max: usize) -> Vec<&str> {
    let mut out = Vec::new();
    let mut remaining = text;
    while !remaining.is_empty() {
        if remaining.len() <= max {
            out.push(remaining);
            break;
        }
        let mut limit = max;
        while !remaining.is_char_boundary(limit) {
            limit -= 1;
        }
        let window = &remaining[..limit];
        let split_at = window
            .rfind('\n')
            .or_else(|| window.rfind(' '))
            .map(|i| i + 1)
            .unwrap_or(limit)
            .max(1);
        let (chunk, rest) = remaining.split_at(split_at);
        out.push(chunk);
        remaining = rest;
    }
    out
}

pub fn repo_line(repo: &RepoRecord) -> String {
    format!(
        "- **{}** `{}`\n  {} | id `{}`",
        repo.label(),
        repo.status,
        repo.github_url,
        repo.repo_id
    )
}

pub fn repo_list(repos: &[RepoRecord]) -> String {
    let mut out = String::from("**Repositories** (most recent first)\n");
    for repo in repos {
        out.push_str(&repo_line(repo));
        out.push('\n');
    }
    out
}

/// "Files: N | Chunks: M" from whichever counters the server reported.
pub fn index_summary(result: &IndexResult) -> String {
    let mut parts = Vec::new();
    if let Some(files) = result.files() {
        parts.push(format!("Files: {}", files));
    }
    if let Some(chunks) = result.chunks() {
        parts.push(format!("Chunks: {}", chunks));
    }
    if !parts.is_empty() {
        return parts.join(" | ");
    }
    if result.extra.is_empty() {
        "No counters reported".to_string()
    } else {
        format!(
            "Server replied: `{}`",
            serde_json::Value::Object(result.extra.clone())
        )
    }
}

/// Bulleted, deduplicated citation list, or nothing when there are none.
pub fn sources_block(message: &ChatMessage) -> String {
    let unique = unique_sources(&message.sources);
    if unique.is_empty() {
        return String::new();
    }
    let mut out = String::from("**Sources:**\n");
    for source in unique {
        out.push_str(&format!("- `{}`\n", format_source(source)));
    }
    out
}

pub fn answer_reply(repo: &RepoRecord, question: &str, reply: &ChatMessage) -> String {
    let mut out = format!(
        "**Q:** {}\n**Repo:** {}\n\n**A:** {}\n",
        question.trim(),
        repo.label(),
        reply.content
    );
    let sources = sources_block(reply);
    if !sources.is_empty() {
        out.push('\n');
        out.push_str(&sources);
    }
    out
}

pub fn transcript(repo_label: &str, messages: &[ChatMessage]) -> String {
    let mut out = format!("**Chat on {}**\n", repo_label);
    for message in messages {
        let who = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!("\n**{}:** {}\n", who, message.content));
        out.push_str(&sources_block(message));
    }
    out
}
