use std::path::PathBuf;
use tracing::{info, warn};

use super::{CommandError, Context};
use crate::revision::store::read_tip;
use crate::revision::SequenceEntry;

/// The two stored revisions an interdiff compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub before: SequenceEntry,
    pub after: SequenceEntry,
}

/// Choose revisions from `revisions` (newest first). `after` defaults to
/// the newest revision and `before` to the one preceding `after`.
pub fn select(
    number: u64,
    revisions: &[PathBuf],
    before: Option<u32>,
    after: Option<u32>,
) -> Result<Selection, CommandError> {
    let entries: Vec<SequenceEntry> = revisions
        .iter()
        .filter_map(|p| SequenceEntry::parse(p))
        .collect();

    let find = |sequence: u32| {
        entries
            .iter()
            .find(|e| e.sequence == sequence)
            .cloned()
            .ok_or_else(|| {
                CommandError::Validation(format!("PR #{number} has no revision {sequence}"))
            })
    };

    let after = match after {
        Some(sequence) => find(sequence)?,
        None => entries
            .first()
            .cloned()
            .ok_or_else(|| CommandError::Validation(format!("PR #{number} has no revisions")))?,
    };

    let before = match before {
        Some(sequence) => find(sequence)?,
        None => entries
            .iter()
            .find(|e| e.sequence < after.sequence)
            .cloned()
            .ok_or_else(|| {
                CommandError::Validation(format!(
                    "PR #{number} has no revision before {}",
                    after.sequence
                ))
            })?,
    };

    if before.sequence == after.sequence {
        return Err(CommandError::Validation(format!(
            "cannot interdiff revision {} against itself",
            after.sequence
        )));
    }
    Ok(Selection { before, after })
}

/// `ackr interdiff <PR> [BEFORE] [AFTER]`: range-diff two stored revisions.
pub fn run(
    ctx: &Context<'_>,
    number: u64,
    before: Option<u32>,
    after: Option<u32>,
    no_pager: bool,
) -> Result<(), CommandError> {
    let revisions = ctx.store.ordered_revisions(number)?;
    let selection = select(number, &revisions, before, after)?;

    let before_tip = read_tip(&selection.before.path).map_err(CommandError::io(&selection.before.path))?;
    let after_tip = read_tip(&selection.after.path).map_err(CommandError::io(&selection.after.path))?;
    info!(
        before = selection.before.sequence,
        after = selection.after.sequence,
        "computing interdiff"
    );

    let output = ctx
        .vcs
        .range_diff(&ctx.config.upstream_base(), &before_tip, &after_tip)?;

    if output.trim().is_empty() {
        println!(
            "No differences between revisions {} and {}",
            selection.before.sequence, selection.after.sequence
        );
        return Ok(());
    }

    if no_pager {
        print!("{output}");
        return Ok(());
    }
    if let Err(e) = ctx.runner.pipe_into(&ctx.config.pager, &output) {
        warn!(pager = %ctx.config.pager, error = %e, "pager failed, printing directly");
        print!("{output}");
    }
    Ok(())
}
