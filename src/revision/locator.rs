use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::store::{dirs_with_prefix, display_paths};
use super::tag::{RevisionTag, TagParseError, TAG_PREFIX};

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("HEAD not recognized by ackr (tags: {})", describe_seen(.seen))]
    NotFound { seen: Vec<String> },

    #[error(transparent)]
    MalformedTag(#[from] TagParseError),

    #[error("no ackr data for {tag}: nothing matching `{prefix}` in {parent}")]
    Missing {
        tag: String,
        prefix: String,
        parent: PathBuf,
    },

    #[error("ambiguous ackr data for {tag}: `{prefix}` matches {}", display_paths(.candidates))]
    Ambiguous {
        tag: String,
        prefix: String,
        candidates: Vec<PathBuf>,
    },

    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn describe_seen(seen: &[String]) -> String {
    if seen.is_empty() {
        "none".to_string()
    } else {
        seen.join(", ")
    }
}

/// Reduce a name as printed by `git name-rev` to a bare tag name:
/// `tags/ackr/1.2.a.b~3` becomes `ackr/1.2.a.b`.
fn normalize(name: &str) -> &str {
    let name = name.strip_prefix("tags/").unwrap_or(name);
    match name.find(['~', '^']) {
        Some(end) => &name[..end],
        None => name,
    }
}

/// Pick the ackr tag describing the current checkout.
///
/// Names outside the `ackr/` namespace are ignored. If only malformed ackr
/// tags are present the parse error is returned; with none at all the result
/// is [`LocateError::NotFound`].
pub fn current_tag(names: &[String]) -> Result<RevisionTag, LocateError> {
    let mut first_error = None;

    for name in names {
        let candidate = normalize(name);
        if !candidate.starts_with(TAG_PREFIX) {
            continue;
        }
        match candidate.parse::<RevisionTag>() {
            Ok(tag) => {
                debug!(%tag, "current revision tag");
                return Ok(tag);
            }
            Err(e) => {
                debug!(name = %candidate, error = %e, "ignoring malformed ackr tag");
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(LocateError::MalformedTag(e)),
        None => Err(LocateError::NotFound {
            seen: names.to_vec(),
        }),
    }
}

fn exactly_one(tag: &RevisionTag, parent: &Path, prefix: String) -> Result<PathBuf, LocateError> {
    let mut candidates = dirs_with_prefix(parent, &prefix).map_err(|source| LocateError::Io {
        path: parent.to_path_buf(),
        source,
    })?;

    match candidates.len() {
        0 => Err(LocateError::Missing {
            tag: tag.to_string(),
            prefix,
            parent: parent.to_path_buf(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(LocateError::Ambiguous {
            tag: tag.to_string(),
            prefix,
            candidates,
        }),
    }
}

/// Storage directory of the revision a tag names: the single PR directory
/// starting with `{pr_number}.`, then its single subdirectory starting with
/// `{sequence}.`.
pub fn current_revision_dir(root: &Path, tag: &RevisionTag) -> Result<PathBuf, LocateError> {
    let pr_dir = exactly_one(tag, root, format!("{}.", tag.pr_number))?;
    let revision_dir = exactly_one(tag, &pr_dir, format!("{}.", tag.sequence))?;
    debug!(dir = %revision_dir.display(), "located revision directory");
    Ok(revision_dir)
}
