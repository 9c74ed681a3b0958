pub mod slug;
pub mod types;

pub use types::PullRequest;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;

const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Error)]
pub enum PrError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid PR reference: {0}")]
    InvalidReference(String),

    #[error("PR {url} belongs to {found}, not the configured upstream {expected}")]
    WrongRepository {
        url: String,
        found: String,
        expected: String,
    },

    #[error("Unexpected PR metadata: {0}")]
    Metadata(#[source] serde_json::Error),
}

/// Parse a PR given on the command line: `42`, `#42`, or a GitHub PR URL
/// (`https://github.com/{owner}/{repo}/pull/{number}`) for `expected_repo`.
pub fn parse_pr_ref(arg: &str, expected_repo: &str) -> Result<u64, PrError> {
    let trimmed = arg.trim();
    let bare = trimmed.strip_prefix('#').unwrap_or(trimmed);
    if let Ok(number) = bare.parse::<u64>() {
        return Ok(number);
    }

    let parsed =
        reqwest::Url::parse(trimmed).map_err(|_| PrError::InvalidReference(arg.to_string()))?;

    if parsed.host_str() != Some("github.com") {
        return Err(PrError::InvalidReference(arg.to_string()));
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(|| PrError::InvalidReference(arg.to_string()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() < 4 || segments[2] != "pull" {
        return Err(PrError::InvalidReference(arg.to_string()));
    }

    let found = format!("{}/{}", segments[0], segments[1]);
    if !found.eq_ignore_ascii_case(expected_repo) {
        return Err(PrError::WrongRepository {
            url: arg.to_string(),
            found,
            expected: expected_repo.to_string(),
        });
    }

    segments[3]
        .parse::<u64>()
        .map_err(|_| PrError::InvalidReference(arg.to_string()))
}

/// Read-only source of pull request metadata.
#[async_trait]
pub trait PullRequestSource: Send + Sync {
    /// The raw API document for a PR.
    async fn fetch_raw(&self, number: u64) -> Result<Value, PrError>;

    async fn fetch(&self, number: u64) -> Result<PullRequest, PrError> {
        PullRequest::from_json(self.fetch_raw(number).await?)
    }
}

/// Fetches PRs from the GitHub REST API (`GET /repos/{repo}/pulls/{number}`).
pub struct GitHubSource {
    client: reqwest::Client,
    api_base: String,
    repo: String,
    token: Option<String>,
}

impl GitHubSource {
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: GITHUB_API.to_string(),
            repo: config.upstream_repo.clone(),
            token: config.github_token.clone(),
        }
    }

    fn pull_url(&self, number: u64) -> String {
        format!("{}/repos/{}/pulls/{}", self.api_base, self.repo, number)
    }
}

#[async_trait]
impl PullRequestSource for GitHubSource {
    #[instrument(skip(self), fields(repo = %self.repo))]
    async fn fetch_raw(&self, number: u64) -> Result<Value, PrError> {
        let mut request = self
            .client
            .get(self.pull_url(number))
            .header("User-Agent", "ackr")
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        debug!("fetching PR metadata from GitHub API");
        let value = request
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        debug!(title = ?value.get("title"), "received PR metadata");
        Ok(value)
    }
}


#[cfg(test)]
mod tests {
    use super::fixture::StaticSource;
    use super::*;

    #[test]
    fn test_parse_plain_and_hash_numbers() {
        assert_eq!(parse_pr_ref("42", "bitcoin/bitcoin").unwrap(), 42);
        assert_eq!(parse_pr_ref("#42", "bitcoin/bitcoin").unwrap(), 42);
    }

    #[test]
    fn test_parse_valid_pr_url() {
        let number =
            parse_pr_ref("https://github.com/bitcoin/bitcoin/pull/42/files", "bitcoin/bitcoin")
                .unwrap();
        assert_eq!(number, 42);
    }

    #[test]
    fn test_parse_invalid_pr_ref() {
        assert!(parse_pr_ref("https://example.com", "bitcoin/bitcoin").is_err());
        assert!(parse_pr_ref("not-a-pr", "bitcoin/bitcoin").is_err());
        assert!(parse_pr_ref("https://github.com/bitcoin/bitcoin/pulls/42", "bitcoin/bitcoin").is_err());
    }

    #[test]
    fn test_parse_url_for_other_repo_is_rejected() {
        let err = parse_pr_ref("https://github.com/org/repo/pull/42", "bitcoin/bitcoin").unwrap_err();
        assert!(matches!(err, PrError::WrongRepository { .. }));
    }

    #[test]
    fn test_pull_url() {
        let mut config = crate::config::Config::resolve(
            &crate::config::FileConfig::default(),
            |_: &str| None,
            None,
        );
        config.upstream_repo = "org/repo".to_string();
        let source = GitHubSource::new(&config);
        assert_eq!(source.pull_url(7), "https://api.github.com/repos/org/repo/pulls/7");
    }

    #[tokio::test]
    async fn test_fetch_goes_through_from_json() {
        let source = StaticSource::with_pr(42, "alice", "Fix bug");
        let pr = source.fetch(42).await.unwrap();
        assert_eq!(pr.dir_name(), "42.alice.fix_bug");
        assert!(source.fetch(43).await.is_err());
    }
}
