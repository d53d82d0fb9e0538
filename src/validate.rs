use once_cell::sync::Lazy;
use regex::Regex;

/// `https://github.com/<owner>/<repo>` with at most one trailing slash.
static GITHUB_REPO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+/?$")
        .expect("static regex")
});

/// Returns true when `url` (after trimming) names a GitHub repository root.
pub fn is_valid_repo_url(url: &str) -> bool {
    GITHUB_REPO_RE.is_match(url.trim())
}
