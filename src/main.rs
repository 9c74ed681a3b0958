mod commands;
mod config;
mod git;
mod pr;
mod report;
mod revision;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use commands::{CommandError, Context};
use git::{CommandRunner, GitCli};
use pr::GitHubSource;

/// ackr: review assistant that snapshots each revision of a pull request,
/// tags it locally and keeps a per-commit review checklist.
#[derive(Parser, Debug)]
#[command(name = "ackr", version, about)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a PR and store its newest revision if the tip changed
    Pull {
        /// PR number, `#number` or GitHub pull URL
        pr: String,
    },

    /// Print the raw GitHub API document for a PR
    PrData { pr: String },

    /// List the stored revisions of a PR, newest first
    List { pr: String },

    /// Open the review checklist of a revision in $EDITOR
    Review {
        /// Revision tag (`ackr/<pr>.<seq>.<author>.<slug>`); defaults to the checkout
        tag: Option<String>,
    },

    /// Show which revision the checkout is on and how far its review got
    Status,

    /// Record HEAD as the point review has reached
    Checkpoint,

    /// Range-diff two stored revisions of a PR
    Interdiff {
        pr: String,
        /// Older revision sequence (default: the one before AFTER)
        before: Option<u32>,
        /// Newer revision sequence (default: the newest)
        after: Option<u32>,
        /// Print to stdout instead of the pager
        #[arg(long)]
        no_pager: bool,
    },

    /// Render a markdown update comment comparing two pushed tags
    TagUpdate { tag: String, one: String, two: String },

    /// Write, sign and copy an ACK message for the checked-out revision
    Ack {
        /// Message file, `-` for stdin; default edits the stored message
        msg_file: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::Config::load()?;
    debug!(storage_dir = ?config.storage_dir, upstream = %config.upstream_repo, "configuration loaded");

    let source = GitHubSource::new(&config);
    let runner = CommandRunner::new();
    let vcs = GitCli::new(runner.clone());
    let ctx = Context::new(&config, &vcs, &runner);

    // pr-data only talks to the API and works from any directory.
    if !matches!(command, Commands::PrData { .. }) {
        ctx.ensure_environment(&std::env::current_dir()?)?;
        for created in ctx.store.init()? {
            println!("Created state directory at {}", created.display());
        }
    }

    let pr_number = |arg: &str| -> Result<u64, CommandError> {
        Ok(pr::parse_pr_ref(arg, &config.upstream_repo)?)
    };

    match command {
        Commands::Pull { pr } => commands::pull::run(&ctx, &source, pr_number(&pr)?).await?,
        Commands::PrData { pr } => commands::pr_data::run(&source, pr_number(&pr)?).await?,
        Commands::List { pr } => commands::list::run(&ctx, pr_number(&pr)?)?,
        Commands::Review { tag } => commands::review::run(&ctx, tag.as_deref())?,
        Commands::Status => commands::status::run(&ctx)?,
        Commands::Checkpoint => commands::checkpoint::run(&ctx)?,
        Commands::Interdiff {
            pr,
            before,
            after,
            no_pager,
        } => commands::interdiff::run(&ctx, pr_number(&pr)?, before, after, no_pager)?,
        Commands::TagUpdate { tag, one, two } => {
            commands::tag_update::run(&ctx, &tag, &one, &two)?
        }
        Commands::Ack { msg_file } => commands::ack::run(&ctx, msg_file.as_deref())?,
    }

    Ok(())
}
