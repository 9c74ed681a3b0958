use super::{CommandError, Context};
use crate::revision::store::{write_file, CURRENT_COMMIT};

/// `ackr checkpoint`: remember HEAD as the point review has reached in the
/// current revision.
pub fn run(ctx: &Context<'_>) -> Result<(), CommandError> {
    let (tag, dir) = ctx.revision_dir(None)?;
    let head = ctx.vcs.rev_parse("HEAD")?;
    write_file(&dir.join(CURRENT_COMMIT), &head)?;
    println!("Review of {} checkpointed at {}", tag, head);
    Ok(())
}
