use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::OpenAiAgent;
use flocksift_common::{Config, Credentials};
use flocksift_scout::browser::BrowserPool;
use flocksift_scout::Pipeline;

/// Collect a target account's followers and report the ones matching the
/// classification predicate.
#[derive(Parser)]
#[command(name = "flocksift-scout")]
struct Args {
    /// Account to log in as.
    #[arg(long)]
    login_user: String,

    /// Password for the login account.
    #[arg(long)]
    login_pass: String,

    /// Target account whose followers are scanned.
    #[arg(long)]
    target: String,

    /// Max distinct followers to collect (default from MAX_FOLLOWERS).
    #[arg(long)]
    max_count: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("flocksift=info".parse()?))
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    info!("Flocksift scout starting...");

    let pool = Arc::new(BrowserPool::launch(config.max_concurrent_pages).await?);
    let agent = Arc::new(OpenAiAgent::new(
        &config.openai_api_key,
        &config.classifier_model,
    ));
    let pipeline = Pipeline::from_config(pool.clone(), agent, &config);

    let creds = Credentials::new(args.login_user, args.login_pass);
    let max_count = args.max_count.unwrap_or(config.default_max_followers);

    let result = pipeline.run(&creds, &args.target, max_count).await;

    // Release the browser before reporting, even on failure.
    drop(pipeline);
    if let Ok(pool) = Arc::try_unwrap(pool) {
        if let Err(e) = pool.shutdown().await {
            warn!(error = %e, "Browser shutdown failed");
        }
    }

    let rows = result?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "count": rows.len(),
            "results": rows,
        }))?
    );
    Ok(())
}
