use super::{CommandError, Context};
use crate::config::Config;

/// Markdown announcing that one of your own branches moved from tag
/// `{tag}.{one}` to `{tag}.{two}`, with the range-diff folded away.
pub fn render(config: &Config, tag: &str, one: &str, two: &str, range_diff: &str) -> String {
    let base = format!(
        "https://github.com/{}/{}/tree/{}.",
        config.gh_user,
        config.repo_name(),
        tag
    );
    format!(
        "[`{tag}.{one}`]({base}{one}) -> [`{tag}.{two}`]({base}{two})\n\
         \n\
         <details><summary>Show range-diff</summary>\n\
         \n\
         ```sh\n\
         $ git range-diff {branch} {tag}.{one} {tag}.{two}\n\
         \n\
         {diff}\n\
         ```\n\
         \n\
         </details>\n",
        branch = config.base_branch,
        diff = range_diff.trim_end(),
    )
}

/// `ackr tag-update <TAG> <ONE> <TWO>`
pub fn run(ctx: &Context<'_>, tag: &str, one: &str, two: &str) -> Result<(), CommandError> {
    let range_diff = ctx.vcs.range_diff(
        &ctx.config.base_branch,
        &format!("{tag}.{one}"),
        &format!("{tag}.{two}"),
    )?;
    print!("{}", render(ctx.config, tag, one, two, &range_diff));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::config;

    #[test]
    fn test_render_links_both_tags() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let text = render(&config, "utxo-dump", "1", "2", "1: abc = 1: abc\n");

        assert!(text.starts_with(
            "[`utxo-dump.1`](https://github.com/jamesob/bitcoin/tree/utxo-dump.1) -> \
             [`utxo-dump.2`](https://github.com/jamesob/bitcoin/tree/utxo-dump.2)\n"
        ));
        assert!(text.contains("$ git range-diff master utxo-dump.1 utxo-dump.2\n\n1: abc = 1: abc\n```"));
        assert!(text.ends_with("</details>\n"));
    }
}
