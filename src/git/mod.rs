pub mod runner;

pub use runner::{CommandRunner, RunError};

use std::path::Path;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum GitError {
    #[error(transparent)]
    Run(#[from] RunError),

    #[error("must be running within the project's git repo (no src/ and .git/ in {0})")]
    NotProjectRoot(String),

    #[error("Missing upstream remote; run `git remote add {remote} https://github.com/{repo}.git`")]
    MissingRemote { remote: String, repo: String },
}

pub type Result<T> = std::result::Result<T, GitError>;

/// The version-control operations ackr relies on.
///
/// Production uses [`GitCli`]; tests drive the orchestration through an
/// in-memory implementation.
pub trait Vcs {
    /// Fetch the base branch and the PR head into `refs/{remote}/pr/{number}`,
    /// returning the short ref name (`{remote}/pr/{number}`).
    fn fetch_pull(&self, remote: &str, base_branch: &str, number: u64) -> Result<String>;

    /// Resolve any revision expression to a full commit hash.
    fn rev_parse(&self, rev: &str) -> Result<String>;

    /// `git log --oneline <range>`, newest first.
    fn log_oneline(&self, range: &str) -> Result<Vec<String>>;

    /// Non-merge commits reachable from `tip` but not from `exclude`, as
    /// abbreviated one-line entries, newest first.
    fn log_no_merges(&self, tip: &str, exclude: &str) -> Result<Vec<String>>;

    /// Unified diff between two commits.
    fn diff(&self, from: &str, to: &str) -> Result<String>;

    fn create_tag(&self, name: &str, commit: &str) -> Result<()>;

    /// Tag names describing HEAD: tags pointing at it, then the `name-rev`
    /// name of the closest tag that contains it.
    fn tags_describing_head(&self) -> Result<Vec<String>>;

    /// `git range-diff <base> <before> <after>`.
    fn range_diff(&self, base: &str, before: &str, after: &str) -> Result<String>;

    /// A `git config` value, `None` when unset.
    fn config_value(&self, key: &str) -> Result<Option<String>>;

    fn remotes(&self) -> Result<Vec<String>>;
}

/// [`Vcs`] backed by the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    runner: CommandRunner,
}

impl GitCli {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        Ok(self.runner.capture("git", args)?)
    }

    fn git_line(&self, args: &[&str]) -> Result<String> {
        Ok(self.runner.capture_line("git", args)?)
    }
}

fn non_empty_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

impl Vcs for GitCli {
    #[instrument(skip(self))]
    fn fetch_pull(&self, remote: &str, base_branch: &str, number: u64) -> Result<String> {
        let refspec = format!("+refs/pull/{number}/head:refs/{remote}/pr/{number}");
        self.runner
            .stream("git", &["fetch", remote, base_branch, &refspec])?;
        Ok(format!("{remote}/pr/{number}"))
    }

    fn rev_parse(&self, rev: &str) -> Result<String> {
        self.git_line(&["rev-parse", rev])
    }

    fn log_oneline(&self, range: &str) -> Result<Vec<String>> {
        let out = self.git(&["log", "--no-color", "--oneline", range])?;
        Ok(non_empty_lines(&out))
    }

    fn log_no_merges(&self, tip: &str, exclude: &str) -> Result<Vec<String>> {
        let exclude = format!("^{exclude}");
        let out = self.git(&[
            "log",
            "--no-color",
            "--format=oneline",
            "--abbrev-commit",
            "--no-merges",
            tip,
            &exclude,
        ])?;
        Ok(non_empty_lines(&out))
    }

    fn diff(&self, from: &str, to: &str) -> Result<String> {
        self.git(&["diff", "--no-color", from, to])
    }

    fn create_tag(&self, name: &str, commit: &str) -> Result<()> {
        self.git(&["tag", name, commit])?;
        Ok(())
    }

    fn tags_describing_head(&self) -> Result<Vec<String>> {
        let mut names = non_empty_lines(&self.git(&["tag", "--points-at", "HEAD"])?);

        let described = self
            .runner
            .capture_unchecked("git", &["name-rev", "--tags", "--name-only", "HEAD"])?;
        if described.success {
            names.extend(described.stdout.split_whitespace().map(str::to_string));
        }

        debug!(?names, "tags describing HEAD");
        Ok(names)
    }

    fn range_diff(&self, base: &str, before: &str, after: &str) -> Result<String> {
        self.git(&["range-diff", "--no-color", base, before, after])
    }

    fn config_value(&self, key: &str) -> Result<Option<String>> {
        // `git config <key>` exits 1 when the key is unset.
        let out = self.runner.capture_unchecked("git", &["config", key])?;
        let value = out.stdout.trim();
        Ok((out.success && !value.is_empty()).then(|| value.to_string()))
    }

    fn remotes(&self) -> Result<Vec<String>> {
        Ok(non_empty_lines(&self.git(&["remote"])?))
    }
}

/// Fail unless `dir` looks like the root of the project checkout.
pub fn ensure_project_root(dir: &Path) -> Result<()> {
    if dir.join("src").is_dir() && dir.join(".git").exists() {
        Ok(())
    } else {
        Err(GitError::NotProjectRoot(dir.display().to_string()))
    }
}

/// Fail unless the upstream remote is configured.
pub fn ensure_remote(vcs: &dyn Vcs, remote: &str, repo: &str) -> Result<()> {
    if vcs.remotes()?.iter().any(|r| r == remote) {
        Ok(())
    } else {
        Err(GitError::MissingRemote {
            remote: remote.to_string(),
            repo: repo.to_string(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fake::FakeVcs;
    use super::*;

    #[test]
    fn test_non_empty_lines_drops_blanks() {
        assert_eq!(non_empty_lines("a\n\nb  \n"), vec!["a", "b"]);
    }

    #[test]
    fn test_project_root_requires_src_and_git() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ensure_project_root(dir.path()),
            Err(GitError::NotProjectRoot(_))
        ));

        std::fs::create_dir(dir.path().join("src")).unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(ensure_project_root(dir.path()).is_ok());
    }

    #[test]
    fn test_missing_remote_names_the_fix() {
        let vcs = FakeVcs::new();
        assert!(ensure_remote(&vcs, "upstream", "bitcoin/bitcoin").is_ok());

        let err = ensure_remote(&vcs, "btc", "bitcoin/bitcoin").unwrap_err();
        assert!(err
            .to_string()
            .contains("git remote add btc https://github.com/bitcoin/bitcoin.git"));
    }
}
