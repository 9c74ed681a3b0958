use super::{CommandError, Context};
use crate::report::{self, StatusReport};

/// Describe the revision the checkout is on.
pub fn status(ctx: &Context<'_>) -> Result<StatusReport, CommandError> {
    let (tag, dir) = ctx.revision_dir(None)?;
    Ok(StatusReport {
        tag,
        head: ctx.vcs.rev_parse("HEAD")?,
        revision: report::summarize(&dir)?,
    })
}

/// `ackr status`
pub fn run(ctx: &Context<'_>) -> Result<(), CommandError> {
    report::print_status(&status(ctx)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::config;
    use crate::git::fake::{sha, FakeVcs};
    use crate::git::CommandRunner;
    use crate::revision::checklist::Progress;
    use std::fs;

    #[test]
    fn test_status_of_tagged_checkout() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let dir = tmp.path().join("42.alice.fix_bug/2.bbbbbbb");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("HEAD"), sha('b')).unwrap();
        fs::write(dir.join("review-checklist.md"), "- [x] one\n- [ ] two\n").unwrap();

        let vcs = FakeVcs::new();
        *vcs.head.borrow_mut() = sha('b');
        vcs.head_tags.borrow_mut().push("ackr/42.2.alice.fix_bug".to_string());
        let runner = CommandRunner::new();
        let ctx = Context::new(&config, &vcs, &runner);

        let report = status(&ctx).unwrap();
        assert_eq!(report.tag.sequence, 2);
        assert_eq!(report.head, sha('b'));
        assert_eq!(report.revision.dir, dir);
        assert_eq!(report.revision.progress, Some(Progress { checked: 1, total: 2 }));
    }
}
