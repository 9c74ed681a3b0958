use std::path::PathBuf;

use crate::revision::checklist::Progress;
use crate::revision::RevisionTag;

/// How far review of a revision has progressed, judged by its checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReviewState {
    NotStarted,
    InProgress,
    Done,
}

impl From<Progress> for ReviewState {
    fn from(progress: Progress) -> Self {
        if progress.is_complete() {
            ReviewState::Done
        } else if progress.checked > 0 {
            ReviewState::InProgress
        } else {
            ReviewState::NotStarted
        }
    }
}

impl std::fmt::Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReviewState::NotStarted => write!(f, "NOT STARTED"),
            ReviewState::InProgress => write!(f, "IN PROGRESS"),
            ReviewState::Done => write!(f, "DONE"),
        }
    }
}

/// What is stored for one revision directory.
#[derive(Debug, Clone)]
pub struct RevisionSummary {
    /// Sequence number parsed from the directory name
    pub sequence: u32,
    /// Revision directory
    pub dir: PathBuf,
    /// Contents of `HEAD`, if readable
    pub tip: Option<String>,
    /// Checklist progress, if the checklist exists
    pub progress: Option<Progress>,
    /// Commit recorded with `checkpoint`, if any
    pub current_commit: Option<String>,
    /// Whether an ACK message has been written
    pub acked: bool,
}

impl RevisionSummary {
    pub fn state(&self) -> Option<ReviewState> {
        self.progress.map(ReviewState::from)
    }
}

/// The revision the checkout currently sits on.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub tag: RevisionTag,
    pub head: String,
    pub revision: RevisionSummary,
}
