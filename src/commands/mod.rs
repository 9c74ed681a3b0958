pub mod ack;
pub mod checkpoint;
pub mod interdiff;
pub mod list;
pub mod pr_data;
pub mod pull;
pub mod review;
pub mod status;
pub mod tag_update;

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::git::{self, CommandRunner, GitError, RunError, Vcs};
use crate::pr::PrError;
use crate::revision::locator::{self, LocateError};
use crate::revision::store::StoreError;
use crate::revision::{RevisionError, RevisionStore, RevisionTag};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Environment(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Pr(#[from] PrError),

    #[error(transparent)]
    Revision(#[from] RevisionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CommandError {
    pub(crate) fn io(path: &Path) -> impl FnOnce(std::io::Error) -> CommandError + '_ {
        move |source| CommandError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Everything a command needs, built once in `main`.
pub struct Context<'a> {
    pub config: &'a Config,
    pub store: RevisionStore,
    pub vcs: &'a dyn Vcs,
    pub runner: &'a CommandRunner,
}

impl<'a> Context<'a> {
    pub fn new(config: &'a Config, vcs: &'a dyn Vcs, runner: &'a CommandRunner) -> Self {
        Self {
            config,
            store: RevisionStore::new(&config.storage_dir),
            vcs,
            runner,
        }
    }

    /// Refuse to run outside the project checkout or without the upstream
    /// remote. Nothing has been written when this fails.
    pub fn ensure_environment(&self, cwd: &Path) -> Result<(), CommandError> {
        let check = git::ensure_project_root(cwd)
            .and_then(|_| git::ensure_remote(self.vcs, &self.config.upstream_remote, &self.config.upstream_repo));
        match check {
            Ok(()) => Ok(()),
            Err(e @ (GitError::NotProjectRoot(_) | GitError::MissingRemote { .. })) => {
                Err(CommandError::Environment(e.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The tag HEAD currently sits on (or descends from).
    pub fn current_tag(&self) -> Result<RevisionTag, CommandError> {
        let names = self.vcs.tags_describing_head()?;
        Ok(locator::current_tag(&names)?)
    }

    /// Revision directory for `tag`, or for the current checkout when `None`.
    pub fn revision_dir(&self, tag: Option<&RevisionTag>) -> Result<(RevisionTag, PathBuf), CommandError> {
        let tag = match tag {
            Some(tag) => tag.clone(),
            None => self.current_tag()?,
        };
        let dir = locator::current_revision_dir(self.store.root(), &tag)?;
        Ok((tag, dir))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::FileConfig;

    /// Config rooted in a temporary storage directory.
    pub fn config(storage: &Path) -> Config {
        let mut config = Config::resolve(&FileConfig::default(), |_: &str| None, None);
        config.storage_dir = storage.to_path_buf();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::testing::config;
    use super::*;
    use crate::git::fake::FakeVcs;

    #[test]
    fn test_environment_errors_are_classified() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let vcs = FakeVcs::new();
        let runner = CommandRunner::new();
        let ctx = Context::new(&config, &vcs, &runner);

        let err = ctx.ensure_environment(tmp.path()).unwrap_err();
        assert!(matches!(err, CommandError::Environment(ref msg) if msg.contains("src/")));

        std::fs::create_dir(tmp.path().join("src")).unwrap();
        std::fs::create_dir(tmp.path().join(".git")).unwrap();
        assert!(ctx.ensure_environment(tmp.path()).is_ok());
    }

    #[test]
    fn test_revision_dir_uses_explicit_tag() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        std::fs::create_dir_all(tmp.path().join("42.alice.fix_bug/1.aaaaaaa")).unwrap();
        let vcs = FakeVcs::new();
        let runner = CommandRunner::new();
        let ctx = Context::new(&config, &vcs, &runner);

        let tag: RevisionTag = "ackr/42.1.alice.fix_bug".parse().unwrap();
        let (_, dir) = ctx.revision_dir(Some(&tag)).unwrap();
        assert_eq!(dir, tmp.path().join("42.alice.fix_bug/1.aaaaaaa"));

        assert!(matches!(
            ctx.revision_dir(None),
            Err(CommandError::Locate(LocateError::NotFound { .. }))
        ));
    }
}
