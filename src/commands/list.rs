use super::{CommandError, Context};
use crate::report::{self, RevisionSummary};

/// Stored revisions of a PR, newest first.
pub fn summaries(ctx: &Context<'_>, number: u64) -> Result<Vec<RevisionSummary>, CommandError> {
    ctx.store
        .ordered_revisions(number)?
        .iter()
        .map(|dir| report::summarize(dir).map_err(CommandError::from))
        .collect()
}

/// `ackr list <PR>`
pub fn run(ctx: &Context<'_>, number: u64) -> Result<(), CommandError> {
    let revisions = summaries(ctx, number)?;
    report::print_revision_list(number, &revisions);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::config;
    use crate::git::fake::FakeVcs;
    use crate::git::CommandRunner;
    use std::fs;

    #[test]
    fn test_summaries_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        for name in ["1.aaaaaaa", "2.bbbbbbb", "11.ccccccc"] {
            let dir = tmp.path().join("7.bob.thing").join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("HEAD"), "f".repeat(40)).unwrap();
        }
        let vcs = FakeVcs::new();
        let runner = CommandRunner::new();
        let ctx = Context::new(&config, &vcs, &runner);

        let sequences: Vec<u32> = summaries(&ctx, 7).unwrap().iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![11, 2, 1]);
        assert!(run(&ctx, 7).is_ok());
        assert!(matches!(run(&ctx, 8), Err(CommandError::Store(_))));
    }
}
