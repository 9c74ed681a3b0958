use serde::Deserialize;
use serde_json::Value;

use super::slug::slugify;
use super::PrError;

/// A pull request as reported by the GitHub API.
///
/// Built fresh from every API response; nothing is cached between runs.
#[derive(Debug, Clone)]
pub struct PullRequest {
    /// PR number (e.g., 42)
    pub number: u64,
    /// Author's GitHub login
    pub author: String,
    /// PR title
    pub title: String,
    /// Path-safe identifier derived from the title
    pub slug: String,
    /// Full API response, persisted verbatim as `pr.json`
    pub raw: Value,
}

#[derive(Deserialize)]
struct User {
    login: String,
}

#[derive(Deserialize)]
struct PullView {
    number: u64,
    title: String,
    user: User,
}

impl PullRequest {
    /// Extract the fields ackr needs from an API response, keeping the rest.
    pub fn from_json(raw: Value) -> Result<PullRequest, PrError> {
        let view: PullView = serde_json::from_value(raw.clone()).map_err(PrError::Metadata)?;
        Ok(PullRequest {
            number: view.number,
            slug: slugify(&view.title),
            author: view.user.login,
            title: view.title,
            raw,
        })
    }

    /// Storage directory name: `{number}.{author}.{slug}`.
    pub fn dir_name(&self) -> String {
        format!("{}.{}.{}", self.number, self.author, self.slug)
    }

    /// Prefix shared by every storage directory of this PR regardless of the
    /// slug it was created under.
    pub fn dir_prefix(&self) -> String {
        format!("{}.{}.", self.number, self.author)
    }
}
