use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gleaner_bot::bot::Gleaner;
use gleaner_bot::forum::RedditForum;
use gleaner_bot::search::SerperSearcher;
use gleaner_common::Config;
use gleaner_ledger::{Ledger, PgSeenStore};
use reddit_client::RedditClient;
use spacy_client::SpacyClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("gleaner_bot=info".parse()?)
                .add_directive("gleaner_ledger=info".parse()?)
                .add_directive("reddit_client=info".parse()?),
        )
        .init();

    info!("Gleaner starting...");

    // Load config
    let config = Config::from_env();
    config.log_redacted();

    // Connect to Postgres and make sure the seen table exists
    let store = PgSeenStore::connect(&config.database_url).await?;
    store.ensure_schema().await?;
    let ledger = Ledger::new(Arc::new(store), config.max_seen_ids, config.prune_strategy);

    // Log in to the forum and show who we are acting as
    let client = RedditClient::login(
        &config.auth_base_url,
        &config.forum_base_url,
        &config.client_id,
        &config.client_secret,
        &config.username,
        &config.password,
        &config.user_agent,
    )
    .await?;
    let account = client.me().await?;
    info!(
        account = %account.name,
        karma = account.link_karma + account.comment_karma,
        suspended = account.is_suspended,
        "Acting account loaded"
    );

    let forum = RedditForum::new(client, &config.community, &config.username);
    let searcher = SerperSearcher::new(&config.serper_api_key);
    let analyzer = SpacyClient::new(&config.spacy_base_url);

    let gleaner = Gleaner::new(
        Arc::new(forum),
        Arc::new(searcher),
        Arc::new(analyzer),
        ledger,
        config,
    );
    gleaner.run().await?;

    Ok(())
}
