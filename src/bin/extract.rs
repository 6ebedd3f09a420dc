use std::{env, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use job_tracker::{
    config::AppConfig,
    db,
    gmail::{GmailConnector, MailboxConnector},
    llm::GroqClient,
    store::PgStore,
    ExtractionPipeline,
};

const USAGE: &str = "Usage: extract <start-date YYYY-MM-DD> <end-date YYYY-MM-DD>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    let (Some(start), Some(end)) = (args.next(), args.next()) else {
        eprintln!("{USAGE}");
        std::process::exit(1);
    };
    let start = parse_date(&start)?;
    let end = parse_date(&end)?;
    if start > end {
        bail!("start date {start} is after end date {end}");
    }
    let access_token =
        env::var("GMAIL_ACCESS_TOKEN").context("GMAIL_ACCESS_TOKEN must be set")?;

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "extract",
        database_url = %config.redacted_database_url(),
        pool_size = 1,
        model = %config.groq_model,
        "loaded backend configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    db::run_migrations(&pool)?;
    let store = Arc::new(PgStore::new(pool));
    let inference = Arc::new(GroqClient::from_config(&config)?);
    let mailbox = GmailConnector::new(config.gmail_api_base.clone(), config.pipeline.page_size)?;

    let pipeline = ExtractionPipeline::new(
        mailbox.connect(&access_token),
        store.clone(),
        store,
        inference,
        &config.pipeline,
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            tracing::info!("extract received shutdown signal");
            on_signal.cancel();
        }
    });

    let summary = pipeline.run(start, end, &cancel, None).await?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date {raw:?}"))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
