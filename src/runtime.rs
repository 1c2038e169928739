use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::aggregate::AggregationEngine;
use crate::clock::Clock;
use crate::event::{AggregateEvent, FeedEvent, WsConnectionStatus};

/// Drive `engine` from the feed channel and its own boundary deadline.
///
/// Ticks and boundary firings are handled one at a time in this task, so a
/// firing never observes a half-ingested tick. Returns the engine, with its
/// timer disarmed, once the feed closes or shutdown is signalled.
pub async fn run_aggregator<H, C>(
    mut engine: AggregationEngine<H, C>,
    mut feed_rx: mpsc::Receiver<FeedEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> AggregationEngine<H, C>
where
    H: FnMut(AggregateEvent),
    C: Clock,
{
    loop {
        let deadline = engine.next_deadline();
        tokio::select! {
            event = feed_rx.recv() => {
                match event {
                    Some(FeedEvent::Tick(tick)) => {
                        engine.ingest(tick);
                    }
                    Some(FeedEvent::Status(WsConnectionStatus::Connected)) => {
                        tracing::info!("Feed connected");
                        engine.on_connected();
                    }
                    Some(FeedEvent::Status(status)) => {
                        tracing::info!(status = ?status, "Feed status changed");
                    }
                    None => {
                        tracing::info!("Feed channel closed, aggregator exiting");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                engine.fire_due(Instant::now());
            }
            _ = shutdown.changed() => {
                tracing::info!("Aggregator shutting down");
                break;
            }
        }
    }
    engine.shutdown();
    engine
}
