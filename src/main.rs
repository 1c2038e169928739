use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, watch};

use tick_bars::aggregate::AggregationEngine;
use tick_bars::config::Config;
use tick_bars::event::{AggregateEvent, FeedEvent};
use tick_bars::feed::FeedWsClient;
use tick_bars::runtime::run_aggregator;

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("failed to install rustls crypto provider"))?;

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {:#}", e);
            eprintln!("Set TICK_BARS_CONFIG or create config/default.toml");
            std::process::exit(1);
        }
    };

    // Logs go to stderr, stdout carries bars only
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.logging.level.as_str())
            }),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .json()
        .init();

    let resolution_ms = config
        .resolution_ms()
        .context("validated aggregate.resolution became invalid at runtime")?;
    tracing::info!(
        url = %config.feed.url,
        topic = %config.feed.topic,
        resolution_ms,
        "Starting tick-bars"
    );

    let (feed_tx, feed_rx) = mpsc::channel::<FeedEvent>(1024);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AggregateEvent>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ws_client = FeedWsClient::new(&config.feed.url, &config.feed.topic);
    let ws_shutdown = shutdown_rx.clone();
    let feed_done_tx = shutdown_tx.clone();
    let feed_task = tokio::spawn(async move {
        if let Err(e) = ws_client.connect_and_run(feed_tx, ws_shutdown).await {
            tracing::warn!(error = %e, "Feed worker stopped");
        }
        let _ = feed_done_tx.send(true);
    });

    let engine = AggregationEngine::new(resolution_ms, move |event| {
        if event_tx.send(event).is_err() {
            tracing::warn!("Event channel closed, dropping aggregate event");
        }
    });
    let mut main_shutdown = shutdown_rx.clone();
    let engine_task = tokio::spawn(run_aggregator(engine, feed_rx, shutdown_rx));

    // Ctrl+C handler
    let ctrl_c_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received");
        let _ = ctrl_c_shutdown.send(true);
    });

    loop {
        tokio::select! {
            event = event_rx.recv() => {
                match event {
                    Some(AggregateEvent::Bar(bar)) => {
                        let line = serde_json::to_string(&bar).context("failed to serialize bar")?;
                        println!("{}", line);
                    }
                    Some(other) => tracing::info!(event = other.name(), "Aggregator event"),
                    None => break,
                }
            }
            _ = main_shutdown.changed() => break,
        }
    }

    let _ = shutdown_tx.send(true);
    let engine = engine_task.await.context("aggregator task panicked")?;
    feed_task.await.ok();
    tracing::info!(buffered = engine.buffered(), "Shutdown complete");
    Ok(())
}
