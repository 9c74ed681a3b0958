/// Marker for a checklist item still to be reviewed.
pub const UNCHECKED: &str = "- [ ] ";

/// Build the review checklist from `git log --oneline` style entries given
/// newest first. The checklist lists them oldest first.
pub fn render(log_newest_first: &[String]) -> String {
    log_newest_first
        .iter()
        .rev()
        .map(|entry| format!("{UNCHECKED}{entry}\n"))
        .collect()
}

/// How far a reviewer has got through a checklist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    pub checked: usize,
    pub total: usize,
}

impl Progress {
    /// Count `- [ ]` and `- [x]` items, ignoring notes and other lines.
    pub fn of(checklist: &str) -> Progress {
        checklist
            .lines()
            .map(str::trim_start)
            .fold(Progress::default(), |mut acc, line| {
                if line.starts_with("- [ ]") {
                    acc.total += 1;
                } else if line.starts_with("- [x]") || line.starts_with("- [X]") {
                    acc.total += 1;
                    acc.checked += 1;
                }
                acc
            })
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.checked == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_is_oldest_first() {
        let log = vec![
            "abc1234 commit3".to_string(),
            "def4567 commit2".to_string(),
            "1111111 commit1".to_string(),
        ];
        assert_eq!(
            render(&log),
            "- [ ] 1111111 commit1\n- [ ] def4567 commit2\n- [ ] abc1234 commit3\n"
        );
    }

    #[test]
    fn test_render_empty_log() {
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn test_progress_counts_only_items() {
        let text = "- [x] 1111111 commit1\n  notes about it\n- [ ] def4567 commit2\n  - [X] nested item\n";
        let progress = Progress::of(text);
        assert_eq!(progress, Progress { checked: 2, total: 3 });
        assert!(!progress.is_complete());
        assert!(Progress::of("- [x] a\n").is_complete());
        assert!(!Progress::of("").is_complete());
    }
}
