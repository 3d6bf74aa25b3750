use std::sync::Arc;

use common::logger::init_logger;
use market::QuoteNormalizer;
use market::exchanges::http::build_http_client;
use spreadwatch::{
    config::AppConfig,
    fetcher::{ExchangeFeed, QuoteFetcher, retry::RetryPolicy},
    metrics::counters::Counters,
    monitor::{Monitor, MonitorSettings},
    notify::{DiscordWebhook, LogNotifier, Notifier},
    storage::{LocalTableStore, TableStore},
};

/// One adapter per configured exchange, all sharing one HTTP client.
fn build_fetcher(cfg: &AppConfig, http: &reqwest::Client) -> QuoteFetcher {
    let feeds = cfg
        .feeds
        .iter()
        .map(|f| ExchangeFeed::new(f.id.clone(), f.symbol.clone(), f.kind.client(http.clone())))
        .collect();

    QuoteFetcher::new(
        feeds,
        QuoteNormalizer::new(cfg.mid_precision, cfg.max_quote_spread_pct),
        RetryPolicy::new(cfg.fetch_max_attempts, cfg.fetch_backoff),
        cfg.fetch_timeout,
    )
}

fn build_notifier(cfg: &AppConfig, http: &reqwest::Client) -> Arc<dyn Notifier> {
    match &cfg.discord_webhook_url {
        Some(url) => Arc::new(DiscordWebhook::new(http.clone(), url.clone())),
        None => {
            tracing::warn!("DISCORD_WEBHOOK_URL not set, notifications go to the log only");
            Arc::new(LogNotifier)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_logger("spreadwatch", is_production);

    tracing::info!("Starting spreadwatch...");

    let cfg = AppConfig::from_env()?;

    tracing::info!(
        market = %cfg.market,
        exchanges = ?cfg.exchange_ids(),
        interval_secs = cfg.poll_interval.as_secs(),
        data_dir = %cfg.data_dir.display(),
        "configuration loaded"
    );

    let http = build_http_client(cfg.fetch_timeout)?;

    let store: Arc<dyn TableStore> = Arc::new(LocalTableStore::new(cfg.data_dir.clone()));

    let monitor = Monitor::new(
        MonitorSettings::from(&cfg),
        build_fetcher(&cfg, &http),
        build_notifier(&cfg, &http),
        store,
        Counters::default(),
    );

    monitor
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    tracing::info!("Shutdown complete");

    Ok(())
}
