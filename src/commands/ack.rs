use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{CommandError, Context};
use crate::git::CommandRunner;
use crate::report;
use crate::revision::store::{write_file, ACK_MESSAGE, ACK_SIGNATURE};
use crate::revision::RevisionTag;

/// Characters of the HEAD hash an ACK message must quote.
const ACK_HASH_LEN: usize = 6;

/// Build settings scraped from the autotools `config.log` of the checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    pub configure_command: String,
    pub clang_version: String,
    pub gcc_version: String,
    pub cxx: String,
    pub cxxflags: String,
}

fn assigned_value(line: &str) -> String {
    line.split_once('=')
        .map(|(_, v)| v)
        .unwrap_or(line)
        .replace('\'', "")
}

impl BuildInfo {
    pub fn parse(config_log: &str) -> BuildInfo {
        let mut info = BuildInfo::default();

        for line in config_log.lines() {
            if line.starts_with("  $") && line.contains("configure ") {
                info.configure_command = line.trim_matches(|c| c == ' ' || c == '$').to_string();
            } else if line.starts_with("clang version") {
                info.clang_version = line.to_string();
            } else if line.starts_with("g++ ") {
                info.gcc_version = line.to_string();
            } else if line.starts_with("CXX=") {
                info.cxx = assigned_value(line);
            } else if line.starts_with("CXXFLAGS=") {
                info.cxxflags.push_str(&assigned_value(line));
            } else if line.contains("_CXXFLAGS=") {
                let value = assigned_value(line);
                if !value.is_empty() {
                    info.cxxflags.push_str(&value);
                    info.cxxflags.push(' ');
                }
            }
        }
        info
    }

    /// Read `config.log`; a missing file gives empty build info.
    pub fn load(path: &Path) -> BuildInfo {
        match std::fs::read_to_string(path) {
            Ok(text) => BuildInfo::parse(&text),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "no config.log found");
                BuildInfo::default()
            }
        }
    }

    pub fn compiler_version(&self) -> &str {
        if self.clang_version.is_empty() {
            &self.gcc_version
        } else {
            &self.clang_version
        }
    }
}

fn or_unknown(value: &str) -> &str {
    let value = value.trim();
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}

/// Everything the ACK header mentions.
#[derive(Debug, Clone)]
pub struct AckHeader<'a> {
    pub head: &'a str,
    pub gh_user: &'a str,
    pub tag: &'a RevisionTag,
    pub tag_url: &'a str,
    pub platform: &'a str,
    pub build: &'a BuildInfo,
}

impl AckHeader<'_> {
    pub fn render(&self) -> String {
        format!(
            "ACK {head} ([`{user}/{tag}`]({url}))\n\
             \n\
             <details><summary>Show platform data</summary>\n\
             <p>\n\
             \n\
             ```\n\
             Tested on {platform}\n\
             \n\
             Configured with {configure}\n\
             \n\
             Compiled with {cxx} {cxxflags}\n\
             \n\
             Compiler version: {compiler}\n\
             ```\n\
             \n\
             </p></details>\n\
             \n",
            head = self.head,
            user = self.gh_user,
            tag = self.tag,
            url = self.tag_url,
            platform = self.platform,
            configure = or_unknown(&self.build.configure_command),
            cxx = or_unknown(&self.build.cxx),
            cxxflags = self.build.cxxflags.trim(),
            compiler = or_unknown(self.build.compiler_version()),
        )
    }
}

/// Where the ACK message body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageSource {
    Stdin,
    /// Edit `ack_message.txt`, seeding it with the header the first time.
    Editor,
    File(PathBuf),
}

impl MessageSource {
    pub fn from_arg(arg: Option<&str>) -> MessageSource {
        match arg {
            None | Some("") => MessageSource::Editor,
            Some("-") => MessageSource::Stdin,
            Some(path) => MessageSource::File(PathBuf::from(path)),
        }
    }
}

/// Require the message to acknowledge the commit actually checked out.
pub fn validate_message(message: &str, head: &str) -> Result<(), CommandError> {
    let prefix = head.get(..ACK_HASH_LEN).unwrap_or(head);
    let marker = format!("ACK {prefix}");
    if message.contains(&marker) {
        Ok(())
    } else {
        Err(CommandError::Validation(format!(
            "message contains incorrect hash (expected `{marker}`)"
        )))
    }
}

/// The message followed by the folded clearsigned copy, when there is one.
pub fn compose(message: &str, signature: Option<&str>) -> String {
    let mut out = message.to_string();
    if let Some(signature) = signature {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("\n<details><summary>Show signature data</summary>\n<p>\n\n```\n");
        out.push_str(signature.trim_end());
        out.push_str("\n```\n\n</p></details>\n");
    }
    out
}

/// Result of preparing an ACK.
#[derive(Debug, Clone)]
pub struct AckOutcome {
    pub tag: RevisionTag,
    pub message_path: PathBuf,
    /// Present when gpg signed the message.
    pub signature_path: Option<PathBuf>,
    /// Text to publish.
    pub output: String,
}

fn platform_description(runner: &CommandRunner) -> String {
    runner
        .capture_line("uname", &["-srm"])
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("{} {}", std::env::consts::OS, std::env::consts::ARCH))
}

fn read_message(
    ctx: &Context<'_>,
    source: &MessageSource,
    message_path: &Path,
    header: &str,
) -> Result<String, CommandError> {
    match source {
        MessageSource::Stdin => {
            let mut message = String::new();
            std::io::stdin()
                .read_to_string(&mut message)
                .map_err(CommandError::io(Path::new("<stdin>")))?;
            Ok(message)
        }
        MessageSource::Editor => {
            if !message_path.is_file() {
                write_file(message_path, header)?;
            }
            ctx.runner.interactive(&ctx.config.editor, &[message_path])?;
            std::fs::read_to_string(message_path).map_err(CommandError::io(message_path))
        }
        MessageSource::File(path) if path.is_file() => {
            std::fs::read_to_string(path).map_err(CommandError::io(path))
        }
        MessageSource::File(path) => Err(CommandError::Validation(format!(
            "bad path given: {}",
            path.display()
        ))),
    }
}

/// Write the ACK message into the current revision and try to sign it with
/// `gpg`. A signing failure leaves the message unsigned instead of failing.
pub fn prepare(
    ctx: &Context<'_>,
    source: &MessageSource,
    config_log: &Path,
    gpg: &str,
) -> Result<AckOutcome, CommandError> {
    let head = ctx.vcs.rev_parse("HEAD")?;
    let (tag, dir) = ctx.revision_dir(None)?;
    let message_path = dir.join(ACK_MESSAGE);
    let signed_path = dir.join(ACK_SIGNATURE);

    let tag_url = format!(
        "https://github.com/{}/{}/tree/{}",
        ctx.config.gh_user,
        ctx.config.repo_name(),
        tag
    );
    let build = BuildInfo::load(config_log);
    let platform = platform_description(ctx.runner);
    let header = AckHeader {
        head: &head,
        gh_user: &ctx.config.gh_user,
        tag: &tag,
        tag_url: &tag_url,
        platform: &platform,
        build: &build,
    }
    .render();

    let message = read_message(ctx, source, &message_path, &header)?;
    validate_message(&message, &head)?;
    write_file(&message_path, &message)?;

    let signing_key = ctx.vcs.config_value("user.signingkey")?.ok_or_else(|| {
        CommandError::Environment("you need to configure git's user.signingkey".to_string())
    })?;

    let message_arg = message_path.to_string_lossy();
    let signed_arg = signed_path.to_string_lossy();
    let signature = match ctx.runner.capture(
        gpg,
        &["--yes", "-u", &signing_key, "-o", &signed_arg, "--clearsign", &message_arg],
    ) {
        Ok(_) => match std::fs::read_to_string(&signed_path) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(path = %signed_path.display(), error = %e, "signature file unreadable");
                None
            }
        },
        Err(e) => {
            warn!(error = %e, "signing failed");
            eprintln!("{}", format!("GPG signing with key {signing_key} failed!").red());
            None
        }
    };
    debug!(signed = signature.is_some(), "ACK prepared");

    Ok(AckOutcome {
        output: compose(&message, signature.as_deref()),
        signature_path: signature.is_some().then_some(signed_path),
        message_path,
        tag,
    })
}

const CLIPBOARD_TOOLS: &[(&str, &str)] = &[
    ("wl-copy", "wl-copy"),
    ("xclip", "xclip -in -selection clipboard"),
    ("pbcopy", "pbcopy"),
];

/// Copy text with the first clipboard tool found on `PATH`.
fn copy_to_clipboard(runner: &CommandRunner, text: &str) -> Result<&'static str, String> {
    let (binary, command_line) = CLIPBOARD_TOOLS
        .iter()
        .find(|(binary, _)| which::which(binary).is_ok())
        .ok_or_else(|| "no clipboard tool found (wl-copy, xclip, pbcopy)".to_string())?;

    runner
        .pipe_into(command_line, text)
        .map(|_| *binary)
        .map_err(|e| e.to_string())
}

/// `ackr ack [MSG_FILE]`
pub fn run(ctx: &Context<'_>, msg_file: Option<&str>) -> Result<(), CommandError> {
    let source = MessageSource::from_arg(msg_file);
    let outcome = prepare(ctx, &source, Path::new("config.log"), "gpg")?;
    println!("Wrote ACK message to {}", outcome.message_path.display());

    print!("{}", report::frame_ack(&outcome.output));

    match copy_to_clipboard(ctx.runner, &outcome.output) {
        Ok(tool) => {
            let what = if outcome.signature_path.is_some() { "Signed ACK" } else { "ACK" };
            println!("\n{what} message copied to clipboard ({tool})");
        }
        Err(reason) => warn!(%reason, "could not copy ACK message to clipboard"),
    }

    println!("\nRemember to run\n\n  git push origin {}", outcome.tag);
    Ok(())
}
