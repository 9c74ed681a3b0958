use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

use super::{CommandError, Context};
use crate::pr::PullRequestSource;
use crate::report;
use crate::revision::{checklist, derive_revision, Revision};

/// What a pull did.
#[derive(Debug)]
pub enum PullOutcome {
    /// The fetched tip is already stored.
    UpToDate { tip: String },
    /// A new revision was stored and tagged.
    Created {
        revision: Revision,
        /// by-date entry, absent when it could not be written
        by_date: Option<PathBuf>,
    },
}

/// Fetch a PR, and when its tip is new: store the revision's artifacts, tag
/// the tip and add the by-date entry. A failed by-date entry only warns.
#[instrument(skip(ctx, source, today))]
pub async fn pull(
    ctx: &Context<'_>,
    source: &dyn PullRequestSource,
    number: u64,
    today: NaiveDate,
) -> Result<PullOutcome, CommandError> {
    let config = ctx.config;

    info!("fetching PR branch");
    let remote_ref = ctx
        .vcs
        .fetch_pull(&config.upstream_remote, &config.base_branch, number)?;

    info!("fetching PR metadata");
    let pr = source.fetch(number).await?;
    debug!(author = %pr.author, title = %pr.title, slug = %pr.slug, "PR metadata");

    let pr_dir = ctx.store.pr_dir(&pr)?;
    let tip = ctx.vcs.rev_parse(&remote_ref)?;
    debug!(%tip, "latest tip");

    let scan = ctx.store.existing_tips(&pr_dir)?;
    for skipped in &scan.skipped {
        debug!(path = %skipped.path.display(), reason = %skipped.reason, "ignoring unreadable stored revision");
    }
    debug!(existing = ?scan.tips, "existing tips");
    if scan.contains(&tip) {
        return Ok(PullOutcome::UpToDate { tip });
    }

    let branch_log = ctx
        .vcs
        .log_oneline(&format!("{}..{}", config.upstream_base(), remote_ref))?;
    let existing = ctx.store.sequence_entries(&pr_dir)?;
    let revision = derive_revision(&pr, &pr_dir, &remote_ref, &tip, &branch_log, &existing, |commit| {
        ctx.vcs.rev_parse(&format!("{commit}~1"))
    })?;

    let diff = ctx.vcs.diff(&revision.base, &revision.tip)?;
    let commits = ctx.vcs.log_no_merges(&revision.tip, &config.upstream_base())?;
    let checklist = checklist::render(&commits);

    let dir = ctx.store.materialize(&revision, &pr, &diff, &checklist)?;
    ctx.vcs.create_tag(&revision.tag.to_string(), &revision.tip)?;
    info!(tag = %revision.tag, short = revision.short_tip(), dir = %dir.display(), "stored new revision");

    let by_date = match ctx.store.link_by_date(&revision, today) {
        Ok(link) => Some(link),
        Err(e) => {
            warn!(error = %e, "could not add by-date entry");
            None
        }
    };

    Ok(PullOutcome::Created { revision, by_date })
}

/// `ackr pull <PR>`
pub async fn run(
    ctx: &Context<'_>,
    source: &dyn PullRequestSource,
    number: u64,
) -> Result<(), CommandError> {
    let today = chrono::Local::now().date_naive();
    match pull(ctx, source, number, today).await? {
        PullOutcome::UpToDate { tip } => report::print_up_to_date(&tip),
        PullOutcome::Created { revision, by_date } => {
            if let Some(link) = by_date {
                debug!(by_date = %link.display(), "indexed revision");
            }
            report::print_tagged(&revision);
        }
    }
    Ok(())
}
