use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::{Revision, SequenceEntry};
use crate::pr::PullRequest;

pub const PR_JSON: &str = "pr.json";
pub const HEAD_FILE: &str = "HEAD";
pub const BASE_DIFF: &str = "base.diff";
pub const CHECKLIST: &str = "review-checklist.md";
pub const ACK_MESSAGE: &str = "ack_message.txt";
pub const ACK_SIGNATURE: &str = "ack_message.asc";
pub const CURRENT_COMMIT: &str = "current_commit";
pub const BY_DATE_DIR: &str = "by-date";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("revision directory {0} already exists; refusing to overwrite it")]
    RevisionExists(PathBuf),

    #[error("no stored PR directory matches `{prefix}` under {root}")]
    NoPrDir { prefix: String, root: PathBuf },

    #[error("several stored PR directories match `{prefix}`: {}", display_paths(.candidates))]
    AmbiguousPrDir {
        prefix: String,
        candidates: Vec<PathBuf>,
    },

    #[error("failed to serialise PR metadata: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub(crate) fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn io_at(path: &Path) -> impl FnOnce(io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// An entry skipped while scanning a PR's stored tips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of [`RevisionStore::existing_tips`]: usable entries and the ones
/// that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipScan {
    /// Full tip hash → sequence number
    pub tips: BTreeMap<String, u32>,
    pub skipped: Vec<SkippedEntry>,
}

impl TipScan {
    pub fn contains(&self, tip: &str) -> bool {
        self.tips.contains_key(tip)
    }
}

/// On-disk layout:
///
/// ```text
/// {root}/by-date/{date}.{pr dir}.{seq}        -> ../{pr dir}/{seq}.{short}
/// {root}/{number}.{author}.{slug}/{seq}.{short}/{pr.json,HEAD,base.diff,review-checklist.md}
/// ```
///
/// Only one ackr process is expected to write at a time.
#[derive(Debug, Clone)]
pub struct RevisionStore {
    root: PathBuf,
}

impl RevisionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn by_date_dir(&self) -> PathBuf {
        self.root.join(BY_DATE_DIR)
    }

    /// Create the storage root and the by-date index if missing, returning
    /// the directories that had to be created.
    pub fn init(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut created = Vec::new();
        for dir in [self.root.clone(), self.by_date_dir()] {
            if !dir.is_dir() {
                fs::create_dir_all(&dir).map_err(io_at(&dir))?;
                created.push(dir);
            }
        }
        Ok(created)
    }

    /// Storage directory for a PR. A directory created under an older title
    /// (same number and author, different slug) is reused.
    pub fn pr_dir(&self, pr: &PullRequest) -> Result<PathBuf, StoreError> {
        let prefix = pr.dir_prefix();
        let mut candidates = dirs_with_prefix(&self.root, &prefix).map_err(io_at(&self.root))?;

        match candidates.len() {
            0 => Ok(self.root.join(pr.dir_name())),
            1 => {
                let existing = candidates.remove(0);
                if file_name(&existing) != pr.dir_name() {
                    debug!(existing = %existing.display(), slug = %pr.slug, "PR was renamed, reusing its directory");
                }
                Ok(existing)
            }
            _ => Err(StoreError::AmbiguousPrDir { prefix, candidates }),
        }
    }

    /// The single storage directory whose name starts with `{number}.`.
    pub fn find_pr_dir(&self, number: u64) -> Result<PathBuf, StoreError> {
        let prefix = format!("{number}.");
        let mut candidates = dirs_with_prefix(&self.root, &prefix).map_err(io_at(&self.root))?;
        match candidates.len() {
            0 => Err(StoreError::NoPrDir {
                prefix,
                root: self.root.clone(),
            }),
            1 => Ok(candidates.remove(0)),
            _ => Err(StoreError::AmbiguousPrDir { prefix, candidates }),
        }
    }

    /// Numbered revision directories under a PR directory, in directory order.
    pub fn sequence_entries(&self, pr_dir: &Path) -> Result<Vec<SequenceEntry>, StoreError> {
        if !pr_dir.is_dir() {
            return Ok(Vec::new());
        }
        let dirs = subdirectories(pr_dir).map_err(io_at(pr_dir))?;
        Ok(dirs.iter().filter_map(|d| SequenceEntry::parse(d)).collect())
    }

    /// Map every stored tip of a PR to its sequence number. Entries whose
    /// `HEAD` cannot be read are reported in [`TipScan::skipped`] instead of
    /// failing the scan.
    #[instrument(skip(self), fields(pr_dir = %pr_dir.display()))]
    pub fn existing_tips(&self, pr_dir: &Path) -> Result<TipScan, StoreError> {
        let mut scan = TipScan::default();

        for entry in self.sequence_entries(pr_dir)? {
            match read_tip(&entry.path) {
                Ok(tip) => {
                    scan.tips.insert(tip, entry.sequence);
                }
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "unable to read stored tip, skipping");
                    scan.skipped.push(SkippedEntry {
                        path: entry.path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(tips = scan.tips.len(), skipped = scan.skipped.len(), "scanned stored tips");
        Ok(scan)
    }

    /// Create a revision directory with its four artifacts. Nothing is
    /// rolled back if a later write fails.
    #[instrument(skip_all, fields(tag = %revision.tag))]
    pub fn materialize(
        &self,
        revision: &Revision,
        pr: &PullRequest,
        diff: &str,
        checklist: &str,
    ) -> Result<PathBuf, StoreError> {
        let dir = &revision.path;
        let pr_dir = dir.parent().unwrap_or(&self.root);
        fs::create_dir_all(pr_dir).map_err(io_at(pr_dir))?;

        fs::create_dir(dir).map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                StoreError::RevisionExists(dir.clone())
            } else {
                StoreError::Io {
                    path: dir.clone(),
                    source,
                }
            }
        })?;

        let pretty = serde_json::to_string_pretty(&pr.raw)?;
        write_file(&dir.join(PR_JSON), &pretty)?;
        write_file(&dir.join(HEAD_FILE), &revision.tip)?;
        write_file(&dir.join(BASE_DIFF), diff)?;
        write_file(&dir.join(CHECKLIST), checklist)?;

        debug!(dir = %dir.display(), "materialized revision");
        Ok(dir.clone())
    }

    /// Add `by-date/{date}.{pr dir}.{seq}` pointing at a stored revision.
    /// The index is a convenience; nothing reads it back.
    pub fn link_by_date(&self, revision: &Revision, date: NaiveDate) -> Result<PathBuf, StoreError> {
        let revision_dir = &revision.path;
        let rev_name = file_name(revision_dir);
        let pr_dir = revision_dir.parent().unwrap_or(&self.root);
        let pr_name = file_name(pr_dir);

        let index_dir = self.by_date_dir();
        fs::create_dir_all(&index_dir).map_err(io_at(&index_dir))?;

        let link = index_dir.join(format!(
            "{}.{}.{}",
            date.format("%Y-%m-%d"),
            pr_name,
            revision.sequence
        ));
        let target = Path::new("..").join(&pr_name).join(&rev_name);
        make_link(&target, &link).map_err(io_at(&link))?;
        Ok(link)
    }

    /// Revision directories of a PR, highest sequence number first.
    pub fn ordered_revisions(&self, number: u64) -> Result<Vec<PathBuf>, StoreError> {
        let pr_dir = self.find_pr_dir(number)?;
        let mut entries = self.sequence_entries(&pr_dir)?;
        entries.sort_by(|a, b| b.sequence.cmp(&a.sequence).then_with(|| b.path.cmp(&a.path)));
        Ok(entries.into_iter().map(|e| e.path).collect())
    }
}

/// The tip hash stored in a revision directory.
pub fn read_tip(revision_dir: &Path) -> io::Result<String> {
    let tip = fs::read_to_string(revision_dir.join(HEAD_FILE))?;
    let tip = tip.trim();
    if tip.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidData, "HEAD file is empty"));
    }
    Ok(tip.to_string())
}

/// Read an optional artifact, `None` when the file does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), StoreError> {
    fs::write(path, contents).map_err(io_at(path))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn subdirectories(parent: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(parent)? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Subdirectories of `parent` whose name starts with `prefix`, sorted. A
/// missing parent has none.
pub(crate) fn dirs_with_prefix(parent: &Path, prefix: &str) -> io::Result<Vec<PathBuf>> {
    if !parent.is_dir() {
        return Ok(Vec::new());
    }
    Ok(subdirectories(parent)?
        .into_iter()
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect())
}

#[cfg(unix)]
fn make_link(target: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn make_link(target: &Path, link: &Path) -> io::Result<()> {
    fs::write(link, target.to_string_lossy().as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revision::RevisionTag;
    use serde_json::json;

    fn pr(title: &str) -> PullRequest {
        PullRequest::from_json(json!({
            "number": 42,
            "title": title,
            "user": {"login": "alice"},
        }))
        .unwrap()
    }

    fn revision(store: &RevisionStore, sequence: u32, seed: char) -> Revision {
        let tip = seed.to_string().repeat(40);
        Revision {
            remote_ref: "upstream/pr/42".to_string(),
            base: "0".repeat(40),
            sequence,
            tag: RevisionTag {
                pr_number: 42,
                sequence,
                author: "alice".to_string(),
                slug: "fix_bug".to_string(),
            },
            path: store
                .root()
                .join("42.alice.fix_bug")
                .join(format!("{}.{}", sequence, &tip[..7])),
            tip,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn test_init_creates_root_and_index_once() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path().join("ackr"));
        assert_eq!(store.init().unwrap().len(), 2);
        assert!(store.by_date_dir().is_dir());
        assert!(store.init().unwrap().is_empty());
    }

    #[test]
    fn test_pr_dir_reuses_renamed_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        fs::create_dir(tmp.path().join("42.alice.old_title")).unwrap();

        let dir = store.pr_dir(&pr("New title")).unwrap();
        assert_eq!(dir, tmp.path().join("42.alice.old_title"));
    }

    #[test]
    fn test_pr_dir_is_fresh_when_nothing_matches() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        fs::create_dir(tmp.path().join("42.bob.other")).unwrap();
        fs::create_dir(tmp.path().join("421.alice.other")).unwrap();

        let dir = store.pr_dir(&pr("Fix bug")).unwrap();
        assert_eq!(dir, tmp.path().join("42.alice.fix_bug"));
        assert!(!dir.exists());
    }

    #[test]
    fn test_pr_dir_ambiguity_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        fs::create_dir(tmp.path().join("42.alice.a")).unwrap();
        fs::create_dir(tmp.path().join("42.alice.b")).unwrap();
        assert!(matches!(
            store.pr_dir(&pr("Fix bug")),
            Err(StoreError::AmbiguousPrDir { .. })
        ));
    }

    #[test]
    fn test_materialize_writes_artifacts_and_index() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        store.init().unwrap();
        let rev = revision(&store, 1, 'a');

        let dir = store
            .materialize(&rev, &pr("Fix bug"), "diff text\n", "- [ ] aaaaaaa one\n")
            .unwrap();

        assert_eq!(dir, rev.path);
        assert_eq!(fs::read_to_string(rev.path.join(HEAD_FILE)).unwrap(), rev.tip);
        assert_eq!(fs::read_to_string(rev.path.join(BASE_DIFF)).unwrap(), "diff text\n");
        assert_eq!(
            fs::read_to_string(rev.path.join(CHECKLIST)).unwrap(),
            "- [ ] aaaaaaa one\n"
        );
        let snapshot: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(rev.path.join(PR_JSON)).unwrap()).unwrap();
        assert_eq!(snapshot["user"]["login"], "alice");

        let link = store.link_by_date(&rev, date()).unwrap();
        assert_eq!(link, store.by_date_dir().join("2024-03-09.42.alice.fix_bug.1"));
        #[cfg(unix)]
        {
            let target = fs::read_link(&link).unwrap();
            assert_eq!(target, Path::new("../42.alice.fix_bug/1.aaaaaaa"));
            assert_eq!(read_tip(&link).unwrap(), rev.tip);
        }
    }

    #[test]
    fn test_link_by_date_refuses_existing_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        store.init().unwrap();
        let rev = revision(&store, 1, 'a');
        fs::write(store.by_date_dir().join("2024-03-09.42.alice.fix_bug.1"), "stale").unwrap();

        assert!(matches!(
            store.link_by_date(&rev, date()),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn test_materialize_refuses_existing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        let rev = revision(&store, 1, 'a');
        fs::create_dir_all(&rev.path).unwrap();

        let err = store
            .materialize(&rev, &pr("Fix bug"), "", "")
            .unwrap_err();
        assert!(matches!(err, StoreError::RevisionExists(_)));
    }

    #[test]
    fn test_existing_tips_skips_unreadable_entry() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        let pr_dir = tmp.path().join("42.alice.fix_bug");

        let good = pr_dir.join("1.aaaaaaa");
        fs::create_dir_all(&good).unwrap();
        fs::write(good.join(HEAD_FILE), "a".repeat(40)).unwrap();
        // No HEAD file at all.
        fs::create_dir_all(pr_dir.join("2.bbbbbbb")).unwrap();
        // Not a revision directory.
        fs::create_dir_all(pr_dir.join("notes")).unwrap();

        let scan = store.existing_tips(&pr_dir).unwrap();
        assert_eq!(scan.tips.len(), 1);
        assert_eq!(scan.tips.get(&"a".repeat(40)), Some(&1));
        assert_eq!(scan.skipped.len(), 1);
        assert_eq!(scan.skipped[0].path, pr_dir.join("2.bbbbbbb"));
    }

    #[test]
    fn test_existing_tips_of_unknown_pr_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        let scan = store.existing_tips(&tmp.path().join("1.x.y")).unwrap();
        assert_eq!(scan, TipScan::default());
    }

    #[test]
    fn test_ordered_revisions_sorts_numerically() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        let pr_dir = tmp.path().join("42.alice.fix_bug");
        for name in ["1.aaaaaaa", "2.bbbbbbb", "9.ccccccc", "10.ddddddd"] {
            fs::create_dir_all(pr_dir.join(name)).unwrap();
        }

        let ordered: Vec<String> = store
            .ordered_revisions(42)
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(ordered, vec!["10.ddddddd", "9.ccccccc", "2.bbbbbbb", "1.aaaaaaa"]);
    }

    #[test]
    fn test_ordered_revisions_of_unknown_pr() {
        let tmp = tempfile::tempdir().unwrap();
        let store = RevisionStore::new(tmp.path());
        assert!(matches!(
            store.ordered_revisions(5),
            Err(StoreError::NoPrDir { .. })
        ));
    }

    #[test]
    fn test_read_optional() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CURRENT_COMMIT);
        assert_eq!(read_optional(&path).unwrap(), None);
        fs::write(&path, "abc").unwrap();
        assert_eq!(read_optional(&path).unwrap().as_deref(), Some("abc"));
    }
}
