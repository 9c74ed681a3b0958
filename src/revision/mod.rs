pub mod checklist;
pub mod locator;
pub mod store;
pub mod tag;

pub use store::RevisionStore;
pub use tag::RevisionTag;

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::pr::PullRequest;

/// Characters of the tip hash used in revision directory names.
pub const SHORT_HASH_LEN: usize = 7;

/// Length of a full commit hash.
pub const FULL_HASH_LEN: usize = 40;

#[derive(Debug, Error)]
pub enum RevisionError {
    #[error("branch {0} has no commits of its own; nothing to review")]
    EmptyBranch(String),

    #[error("could not parse commit from branch log line `{0}`")]
    BadLogLine(String),

    #[error("base commit is malformed (expected 40 hex characters): {0}")]
    MalformedBase(String),

    #[error("tip commit is malformed (expected 40 hex characters): {0}")]
    MalformedTip(String),

    #[error("could not find the parent of {commit}: {source}")]
    ParentLookup {
        commit: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// One observed tip of a PR branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Remote tracking ref the tip was read from, e.g. `upstream/pr/42`
    pub remote_ref: String,
    /// Full tip commit hash
    pub tip: String,
    /// Parent of the earliest commit unique to the branch
    pub base: String,
    /// Per-PR sequence number, starting at 1
    pub sequence: u32,
    pub tag: RevisionTag,
    /// `{pr_storage_dir}/{sequence}.{short_tip_hash}`
    pub path: PathBuf,
}

impl Revision {
    pub fn short_tip(&self) -> &str {
        &self.tip[..SHORT_HASH_LEN]
    }
}

/// A `{sequence}.{short_hash}` directory already present under a PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    pub sequence: u32,
    pub short_hash: String,
    pub path: PathBuf,
}

impl SequenceEntry {
    /// Parse a revision directory path; `None` for anything not shaped
    /// `<uint>.<rest>`.
    pub fn parse(path: &Path) -> Option<SequenceEntry> {
        let name = path.file_name()?.to_str()?;
        let (sequence, short_hash) = name.split_once('.')?;
        if sequence.is_empty() || short_hash.is_empty() || !sequence.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        Some(SequenceEntry {
            sequence: sequence.parse().ok()?,
            short_hash: short_hash.to_string(),
            path: path.to_path_buf(),
        })
    }
}

pub fn is_full_hash(candidate: &str) -> bool {
    candidate.len() == FULL_HASH_LEN && candidate.chars().all(|c| c.is_ascii_hexdigit())
}

/// Sequence number for a tip not seen before.
fn next_sequence(existing: &[SequenceEntry]) -> u32 {
    let count = u32::try_from(existing.len()).unwrap_or(u32::MAX - 1);
    let highest = existing.iter().map(|e| e.sequence).max().unwrap_or(0);
    count.max(highest) + 1
}

/// Compute the revision for the current tip of a PR branch.
///
/// `branch_log` is `git log --oneline base..tip` (newest first) and
/// `parent_of` resolves a commit's first parent. The result depends only on
/// the arguments: an unchanged tip maps back onto the entry that already
/// carries its short hash, anything else gets the next sequence number.
pub fn derive_revision<F, E>(
    pr: &PullRequest,
    pr_dir: &Path,
    remote_ref: &str,
    tip: &str,
    branch_log: &[String],
    existing: &[SequenceEntry],
    parent_of: F,
) -> Result<Revision, RevisionError>
where
    F: FnOnce(&str) -> Result<String, E>,
    E: std::error::Error + Send + Sync + 'static,
{
    if !is_full_hash(tip) {
        return Err(RevisionError::MalformedTip(tip.to_string()));
    }

    let earliest_line = branch_log
        .last()
        .ok_or_else(|| RevisionError::EmptyBranch(remote_ref.to_string()))?;
    let earliest = earliest_line
        .split_whitespace()
        .next()
        .ok_or_else(|| RevisionError::BadLogLine(earliest_line.clone()))?;

    let base = parent_of(earliest).map_err(|source| RevisionError::ParentLookup {
        commit: earliest.to_string(),
        source: Box::new(source),
    })?;
    let base = base.trim().to_string();
    if !is_full_hash(&base) {
        return Err(RevisionError::MalformedBase(base.chars().take(100).collect()));
    }

    let short = &tip[..SHORT_HASH_LEN];
    let sequence = match existing.iter().find(|e| e.short_hash == short) {
        Some(entry) => {
            debug!(sequence = entry.sequence, "tip already has a revision slot");
            entry.sequence
        }
        None => next_sequence(existing),
    };

    Ok(Revision {
        remote_ref: remote_ref.to_string(),
        tip: tip.to_string(),
        base,
        sequence,
        tag: RevisionTag {
            pr_number: pr.number,
            sequence,
            author: pr.author.clone(),
            slug: pr.slug.clone(),
        },
        path: pr_dir.join(format!("{sequence}.{short}")),
    })
}
