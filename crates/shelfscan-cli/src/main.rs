mod confirm;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use shelfscan_core::types::Query;
use shelfscan_fetch::{
    ChallengeGate, ConfirmationSource, RenderedFetcher, SessionStore, StructuredClient,
};
use shelfscan_pipeline::{Pipeline, PipelineConfig, RunSummary};

use crate::confirm::ConsoleConfirmation;

#[derive(Debug, Parser)]
#[command(name = "shelfscan")]
#[command(about = "Catalog discovery, enrichment, and review collection")]
struct Cli {
    /// Search term to collect items for.
    search_term: String,

    /// Upper bound on items taken from discovery.
    #[arg(long, default_value_t = 10)]
    max_products: usize,

    /// Upper bound on reviews collected per item.
    #[arg(long, default_value_t = 20)]
    max_reviews: usize,

    /// Width of the enrichment fan-out.
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// Skip items already collected in the existing checkpoint file.
    #[arg(long)]
    resume: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = shelfscan_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    let structured = StructuredClient::new(
        &config.catalog_base_url,
        config.request_timeout_secs,
        &config.user_agent,
        config.max_attempts,
        config.retry_backoff_base_ms,
    )?;
    let rendered = RenderedFetcher::new(
        &config.render_base_url,
        config.render_token.as_deref(),
        config.render_timeout_secs,
        &config.catalog_base_url,
        config.pacing_min_ms,
        config.pacing_max_ms,
    )?;
    let gate = ChallengeGate::new(
        Arc::new(ConsoleConfirmation) as Arc<dyn ConfirmationSource>,
        Duration::from_secs(config.challenge_timeout_secs),
    );

    let pipeline = Pipeline::new(
        Arc::new(structured),
        Arc::new(rendered),
        SessionStore::new(config.session_path.clone()),
        gate,
        PipelineConfig {
            checkpoint_path: config.checkpoint_path.clone(),
            checkpoint_interval: config.checkpoint_interval,
            checkpoint_queue: config.checkpoint_queue,
            challenge_max_retries: config.challenge_max_retries,
            resume: cli.resume,
        },
    );

    let cancel = pipeline.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, finishing in-flight items");
            cancel.cancel();
        }
    });

    let query = Query {
        search_term: cli.search_term,
        max_candidates: cli.max_products,
        max_reviews: cli.max_reviews,
        concurrency: cli.concurrency,
    };
    let items = pipeline.run(&query).await?;

    let summary = RunSummary::of(&items);
    println!(
        "{} items collected ({} succeeded, {} degraded) -> {}",
        summary.total,
        summary.succeeded,
        summary.degraded,
        config.checkpoint_path.display()
    );
    Ok(())
}
