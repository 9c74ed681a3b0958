use tracing::info;

use super::{CommandError, Context};
use crate::revision::store::CHECKLIST;
use crate::revision::RevisionTag;

/// `ackr review [TAG]`: open the review checklist of a revision in the
/// editor. Without a tag, the revision HEAD sits on is used.
pub fn run(ctx: &Context<'_>, tag: Option<&str>) -> Result<(), CommandError> {
    let tag = tag
        .map(|t| t.parse::<RevisionTag>())
        .transpose()
        .map_err(|e| CommandError::Validation(e.to_string()))?;

    let (tag, dir) = ctx.revision_dir(tag.as_ref())?;
    let checklist = dir.join(CHECKLIST);
    if !checklist.is_file() {
        return Err(CommandError::Validation(format!(
            "{} has no {}",
            dir.display(),
            CHECKLIST
        )));
    }

    info!(%tag, path = %checklist.display(), "opening checklist");
    ctx.runner.interactive(&ctx.config.editor, &[checklist.as_path()])?;
    println!("{}", checklist.display());
    Ok(())
}
