//! Insight agent — binary entrypoint.
//! One pass per invocation; scheduling is left to cron/systemd timers/CI.

use std::process::ExitCode;

use insight_agent::config::{load_config_default, Credential};
use insight_agent::ingest::providers::HttpFetcher;
use insight_agent::metrics::Metrics;
use insight_agent::{ai_adapter, Pipeline};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status when the backend credential is missing.
const EXIT_MISSING_CREDENTIAL: u8 = 2;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("insight_agent=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let credential = match Credential::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Fatal: {e}. Set it in the environment (or .env) and run again.");
            return Ok(ExitCode::from(EXIT_MISSING_CREDENTIAL));
        }
    };

    let cfg = load_config_default()?;
    info!(
        feeds = cfg.feeds.len(),
        selection = ?cfg.selection,
        model = %cfg.model,
        key = ?credential,
        "insight agent starting"
    );

    let metrics = match &cfg.metrics_path {
        Some(_) => Some(Metrics::install()?),
        None => None,
    };

    let fetcher = HttpFetcher::new(&cfg)?;
    let provider = ai_adapter::build_provider(&cfg, credential)?;
    let pipeline = Pipeline::new(&cfg, &fetcher, provider.as_ref());

    let today = chrono::Local::now().date_naive();
    let outcome = pipeline.run_once(&mut rand::rng(), today).await?;
    info!(outcome = outcome.label(), "{outcome}");

    if let (Some(m), Some(path)) = (&metrics, &cfg.metrics_path) {
        if let Err(e) = m.write_textfile(path) {
            warn!(error = ?e, "metrics textfile not written");
        }
    }

    info!("insight agent finished");
    Ok(ExitCode::SUCCESS)
}
