use super::CommandError;
use crate::pr::PullRequestSource;

/// `ackr pr-data <PR>`: print the raw API document for a PR.
pub async fn run(source: &dyn PullRequestSource, number: u64) -> Result<(), CommandError> {
    let raw = source.fetch_raw(number).await?;
    println!("{}", serde_json::to_string_pretty(&raw)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pr::fixture::StaticSource;

    #[tokio::test]
    async fn test_unknown_pr_is_an_error() {
        let source = StaticSource::with_pr(1, "alice", "x");
        assert!(run(&source, 1).await.is_ok());
        assert!(matches!(run(&source, 2).await, Err(CommandError::Pr(_))));
    }
}
