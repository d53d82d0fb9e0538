use std::collections::HashSet;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::api::types::ChatSource;

/// A `Sources:` heading line, optionally wrapped in markdown emphasis or a
/// heading marker. Captures whatever follows the colon on the same line.
static SOURCES_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[ \t#*_]*sources[*_]*[ \t]*:[*_]*[ \t]*(.*)$").expect("static regex")
});

/// A list item: `- x`, `* x`, `1. x`, `2) x`, `[3] x`.
static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[-*+•]|\d+[.)]|\[\d+\])[ \t]+\S").expect("static regex")
});

/// A bare file reference such as `src/main.rs:3-9`, optionally in backticks.
static FILE_REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^`?[\w./-]+\.[A-Za-z0-9]+(?::\d+(?:-\d+)?)?`?$").expect("static regex")
});

/// Normalised line range of a citation. Line numbers are 1-based, so a zero
/// bound counts as unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl LineRange {
    /// Prefers `start_line`/`end_line` over the legacy `start`/`end` names.
    pub fn of(source: &ChatSource) -> Self {
        let known = |n: &u64| *n > 0;
        Self {
            start: source.start_line.or(source.start).filter(known),
            end: source.end_line.or(source.end).filter(known),
        }
    }
}

/// `start-end`, `start`, or nothing when the start is unknown.
impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.start, self.end) {
            (Some(start), Some(end)) => write!(f, "{}-{}", start, end),
            (Some(start), None) => write!(f, "{}", start),
            _ => Ok(()),
        }
    }
}

/// `path:range`, or just `path` when no range is known.
pub fn format_source(source: &ChatSource) -> String {
    let range = LineRange::of(source).to_string();
    if range.is_empty() {
        source.path.clone()
    } else {
        format!("{}:{}", source.path, range)
    }
}

/// Drop citations whose path and formatted range were already seen,
/// keeping first-seen order.
pub fn unique_sources(sources: &[ChatSource]) -> Vec<&ChatSource> {
    let mut seen = HashSet::new();
    sources
        .iter()
        .filter(|s| seen.insert(format_source(s)))
        .collect()
}

fn is_citation_line(line: &str) -> bool {
    let line = line.trim();
    line.is_empty()
        || LIST_ITEM_RE.is_match(line)
        || line
            .split(|c| c == ',' || c == ';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .all(|part| FILE_REF_RE.is_match(part))
}

/// The heading line plus everything after it only lists citations.
fn is_citation_block(block: &[&str]) -> bool {
    let Some((heading, rest)) = block.split_first() else {
        return false;
    };
    let inline = SOURCES_HEADING_RE
        .captures(heading)
        .and_then(|caps| caps.get(1))
        .map_or("", |m| m.as_str());
    is_citation_line(inline) && rest.iter().all(|line| is_citation_line(line))
}

/// Remove a trailing `Sources:` block the server appended to the answer text.
///
/// Only the last `Sources:` heading is considered, and only when every line
/// from it to the end reads as a citation. Line endings are normalised first.
/// If nothing but the block would remain, the original answer is returned
/// untouched.
pub fn strip_sources_block(answer: &str) -> String {
    let normalized = answer.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let body = match lines.iter().rposition(|line| SOURCES_HEADING_RE.is_match(line)) {
        Some(idx) if is_citation_block(&lines[idx..]) => lines[..idx].join("\n"),
        _ => normalized.clone(),
    };
    let stripped = body.trim();
    if stripped.is_empty() {
        answer.to_string()
    } else {
        stripped.to_string()
    }
}
