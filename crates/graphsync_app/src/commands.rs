use anyhow::{Context, Result};
use graphsync_engine::{
    AccountContext, Credentials, FsAppendLog, FsPageStore, Pipeline, RunSummary, TwitterClient,
};
use graphsync_logging::sync_info;

use crate::cli::AuthorizeArgs;

pub fn authorize(ctx: &AccountContext, args: AuthorizeArgs) -> Result<()> {
    let credentials = Credentials {
        consumer_key: args.consumer_key,
        consumer_secret: args.consumer_secret,
        access_token_key: args.access_token,
        access_token_secret: args.access_token_secret,
    };
    let path = ctx
        .save_credentials(&credentials)
        .context("saving credentials")?;
    sync_info!("Stored credentials for {} in {}", ctx.account, path.display());
    Ok(())
}

pub async fn follow(ctx: &AccountContext, count: usize, query: &str) -> Result<()> {
    let client = client(ctx)?;
    let (pages, ledger) = (ctx.page_store(), ctx.append_log());
    let summary = pipeline(ctx, &client, &pages, &ledger)
        .follow(count, query)
        .await
        .with_context(|| format!("follow run for {} failed", ctx.account))?;
    report("follow", &summary);
    Ok(())
}

pub async fn unfollow(ctx: &AccountContext) -> Result<()> {
    let client = client(ctx)?;
    let (pages, ledger) = (ctx.page_store(), ctx.append_log());
    let summary = pipeline(ctx, &client, &pages, &ledger)
        .unfollow()
        .await
        .with_context(|| format!("unfollow run for {} failed", ctx.account))?;
    report("unfollow", &summary);
    Ok(())
}

fn client(ctx: &AccountContext) -> Result<TwitterClient> {
    let credentials = ctx.load_credentials()?;
    TwitterClient::new(&ctx.settings, credentials).context("building the HTTP client")
}

fn pipeline<'a>(
    ctx: &'a AccountContext,
    client: &'a TwitterClient,
    pages: &'a FsPageStore,
    ledger: &'a FsAppendLog,
) -> Pipeline<'a> {
    Pipeline {
        account: &ctx.account,
        settings: &ctx.settings,
        api: client,
        pages,
        ledger,
    }
}

fn report(action: &str, summary: &RunSummary) {
    sync_info!(
        "{} done: {} queued, {} completed, {} blocked, {} already logged",
        action,
        summary.queued,
        summary.report.completed.len(),
        summary.report.skipped_blocked.len(),
        summary.report.already_logged.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use graphsync_engine::CREDENTIALS_FILENAME;
    use tempfile::TempDir;

    fn args() -> AuthorizeArgs {
        AuthorizeArgs {
            consumer_key: "ck".into(),
            consumer_secret: "cs".into(),
            access_token: "at".into(),
            access_token_secret: "as".into(),
        }
    }

    #[test]
    fn authorize_writes_a_loadable_bundle() {
        let root = TempDir::new().unwrap();
        let ctx = AccountContext::open(root.path(), "me").unwrap();

        authorize(&ctx, args()).unwrap();

        assert!(root.path().join("me").join(CREDENTIALS_FILENAME).is_file());
        let loaded = ctx.load_credentials().unwrap();
        assert_eq!(loaded.consumer_key, "ck");
        assert_eq!(loaded.access_token_key, "at");
    }

    #[tokio::test]
    async fn follow_without_credentials_points_at_authorize() {
        let root = TempDir::new().unwrap();
        let ctx = AccountContext::open(root.path(), "me").unwrap();

        let err = follow(&ctx, 1, "rust").await.unwrap_err();

        assert!(format!("{err:#}").contains("graphsync me authorize"));
    }
}
