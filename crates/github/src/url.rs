//! GitHub repository URL parsing.

use crate::error::GitHubError;
use regex_lite::Regex;
use std::sync::LazyLock;

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://github\.com/([^/\s]+)/([^/\s]+)").expect("GitHub URL pattern is valid")
});

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl std::fmt::Display for RepoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl std::str::FromStr for RepoRef {
    type Err = GitHubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_github_url(s)
    }
}

/// Extract `owner/repo` from `http(s)://github.com/<owner>/<repo>[...]`.
///
/// A trailing `.git` on the repository name is dropped.
pub fn parse_github_url(url: &str) -> Result<RepoRef, GitHubError> {
    let url = url.trim();
    let caps = GITHUB_URL
        .captures(url)
        .ok_or_else(|| GitHubError::InvalidUrl(url.to_string()))?;

    let owner = &caps[1];
    let repo = caps[2].strip_suffix(".git").unwrap_or(&caps[2]);
    if repo.is_empty() {
        return Err(GitHubError::InvalidUrl(url.to_string()));
    }

    Ok(RepoRef::new(owner, repo))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_url() {
        let r = parse_github_url("https://github.com/octo/demo").unwrap();
        assert_eq!(r, RepoRef::new("octo", "demo"));
        assert_eq!(r.to_string(), "octo/demo");
    }

    #[test]
    fn strips_git_suffix_and_extra_segments() {
        let r = parse_github_url("http://github.com/octo/demo.git").unwrap();
        assert_eq!(r.repo, "demo");
        let r = parse_github_url("https://github.com/octo/demo/tree/main/src").unwrap();
        assert_eq!(r, RepoRef::new("octo", "demo"));
    }

    #[test]
    fn rejects_other_hosts_and_short_paths() {
        assert!(matches!(
            parse_github_url("https://gitlab.com/octo/demo"),
            Err(GitHubError::InvalidUrl(_))
        ));
        assert!(parse_github_url("https://github.com/octo").is_err());
        assert!(parse_github_url("github.com/octo/demo").is_err());
        assert!(parse_github_url("https://github.com/octo/.git").is_err());
    }

    #[test]
    fn from_str_delegates() {
        let r: RepoRef = "https://github.com/a/b".parse().unwrap();
        assert_eq!(r.owner, "a");
    }
}
