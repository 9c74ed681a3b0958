pub mod types;

pub use types::{ReviewState, RevisionSummary, StatusReport};

use colored::Colorize;
use std::fmt::Write as _;
use std::path::Path;

use crate::revision::checklist::Progress;
use crate::revision::store::{
    read_optional, read_tip, StoreError, ACK_MESSAGE, CHECKLIST, CURRENT_COMMIT,
};
use crate::revision::{Revision, SequenceEntry};

const RULE: &str = "--------------------------------------------------------------------------------";

/// Gather what is stored for a revision directory. Missing optional
/// artifacts are reported as absent rather than failing.
pub fn summarize(dir: &Path) -> Result<RevisionSummary, StoreError> {
    let sequence = SequenceEntry::parse(dir).map(|e| e.sequence).unwrap_or(0);
    let checklist = read_optional(&dir.join(CHECKLIST))?;
    let current_commit = read_optional(&dir.join(CURRENT_COMMIT))?
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    Ok(RevisionSummary {
        sequence,
        dir: dir.to_path_buf(),
        tip: read_tip(dir).ok(),
        progress: checklist.as_deref().map(Progress::of),
        current_commit,
        acked: dir.join(ACK_MESSAGE).is_file(),
    })
}

fn short(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

fn progress_line(summary: &RevisionSummary) -> String {
    match (summary.progress, summary.state()) {
        (Some(p), Some(state)) => format!("{}/{} {}", p.checked, p.total, colorize_state(state)),
        _ => "no checklist".dimmed().to_string(),
    }
}

/// Text for `list`: one line per stored revision, newest first.
pub fn format_revision_list(pr_number: u64, revisions: &[RevisionSummary]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "PR #{}: {} revision(s)", pr_number, revisions.len());

    for summary in revisions {
        let tip = summary.tip.as_deref().map(short).unwrap_or("????????");
        let _ = write!(
            out,
            "  {:>3}  {}  {}",
            summary.sequence,
            tip.yellow(),
            progress_line(summary)
        );
        if summary.acked {
            let _ = write!(out, "  {}", "ACKed".green());
        }
        let _ = writeln!(out, "\n       {}", summary.dir.display());
    }
    out
}

/// Text for `status`.
pub fn format_status(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Tag:      {}", report.tag.to_string().bold());
    let _ = writeln!(out, "HEAD:     {}", short(&report.head).yellow());
    let _ = writeln!(out, "Revision: {}", report.revision.dir.display());
    if let Some(tip) = &report.revision.tip {
        let _ = writeln!(out, "Tip:      {}", short(tip));
    }
    let _ = writeln!(out, "Review:   {}", progress_line(&report.revision));
    match &report.revision.current_commit {
        Some(commit) => {
            let marker = if commit == &report.head { " (HEAD)" } else { "" };
            let _ = writeln!(out, "Progress: checkpoint at {}{}", short(commit), marker);
        }
        None => {
            let _ = writeln!(out, "Progress: no checkpoint recorded");
        }
    }
    out
}

/// Frame a finished ACK message for copying out of the terminal.
pub fn frame_ack(message: &str) -> String {
    format!("\n{RULE}\n{}\n{RULE}\n", message.trim_end())
}

pub fn print_revision_list(pr_number: u64, revisions: &[RevisionSummary]) {
    print!("{}", format_revision_list(pr_number, revisions));
}

pub fn print_status(report: &StatusReport) {
    print!("{}", format_status(report));
}

pub fn print_up_to_date(tip: &str) {
    println!("PR up to date ({})", short(tip).green());
}

pub fn print_tagged(revision: &Revision) {
    println!(
        "Tagged {} with {}",
        revision.tip.yellow(),
        revision.tag.to_string().bold()
    );
}

/// Helper to colorize a review state for terminal output.
fn colorize_state(state: ReviewState) -> colored::ColoredString {
    let label = state.to_string();
    match state {
        ReviewState::NotStarted => label.red().bold(),
        ReviewState::InProgress => label.yellow().bold(),
        ReviewState::Done => label.green().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn stored_revision(root: &Path, name: &str, checklist: Option<&str>) -> std::path::PathBuf {
        let dir = root.join("42.alice.fix_bug").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("HEAD"), "a".repeat(40)).unwrap();
        if let Some(text) = checklist {
            fs::write(dir.join(CHECKLIST), text).unwrap();
        }
        dir
    }

    #[test]
    fn test_summarize_reads_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = stored_revision(tmp.path(), "3.aaaaaaa", Some("- [x] a\n- [ ] b\n"));
        fs::write(dir.join(CURRENT_COMMIT), "b".repeat(40) + "\n").unwrap();

        let summary = summarize(&dir).unwrap();
        assert_eq!(summary.sequence, 3);
        assert_eq!(summary.tip, Some("a".repeat(40)));
        assert_eq!(summary.progress, Some(Progress { checked: 1, total: 2 }));
        assert_eq!(summary.current_commit, Some("b".repeat(40)));
        assert_eq!(summary.state(), Some(ReviewState::InProgress));
        assert!(!summary.acked);
    }

    #[test]
    fn test_summarize_tolerates_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("1.bbbbbbb");
        fs::create_dir_all(&dir).unwrap();

        let summary = summarize(&dir).unwrap();
        assert_eq!(summary.tip, None);
        assert_eq!(summary.progress, None);
        assert_eq!(summary.state(), None);
    }

    #[test]
    fn test_revision_list_mentions_every_revision() {
        let tmp = tempfile::tempdir().unwrap();
        let newer = summarize(&stored_revision(tmp.path(), "2.aaaaaaa", Some("- [x] a\n"))).unwrap();
        let older = summarize(&stored_revision(tmp.path(), "1.aaaaaaa", None)).unwrap();

        let text = format_revision_list(42, &[newer, older]);
        assert!(text.contains("PR #42: 2 revision(s)"));
        assert!(text.contains("2.aaaaaaa"));
        assert!(text.contains("1.aaaaaaa"));
        assert!(text.contains("DONE"));
        assert!(text.contains("no checklist"));
    }

    #[test]
    fn test_status_marks_checkpoint_at_head() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = stored_revision(tmp.path(), "2.aaaaaaa", Some("- [ ] a\n"));
        fs::write(dir.join(CURRENT_COMMIT), "c".repeat(40)).unwrap();

        let report = StatusReport {
            tag: "ackr/42.2.alice.fix_bug".parse().unwrap(),
            head: "c".repeat(40),
            revision: summarize(&dir).unwrap(),
        };
        let text = format_status(&report);
        assert!(text.contains("ackr/42.2.alice.fix_bug"));
        assert!(text.contains("checkpoint at cccccccc (HEAD)"));
        assert!(text.contains("NOT STARTED"));
    }

    #[test]
    fn test_frame_ack_wraps_message() {
        let framed = frame_ack("ACK abc\n\n");
        assert!(framed.starts_with('\n'));
        assert!(framed.contains(&format!("{RULE}\nACK abc\n{RULE}")));
    }

    #[test]
    fn test_short_hash_handles_short_input() {
        assert_eq!(short("abc"), "abc");
        assert_eq!(short(&"d".repeat(40)), "dddddddd");
    }
}
