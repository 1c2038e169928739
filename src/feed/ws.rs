use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;

use super::types::decode_ticks;
use crate::error::FeedError;
use crate::event::{FeedEvent, WsConnectionStatus};

/// Exponential backoff for reconnection.
#[derive(Debug)]
pub struct ExponentialBackoff {
    current: Duration,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            initial,
            max,
            factor,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Trade feed transport: connects, subscribes with `topic`, forwards ticks.
#[derive(Debug, Clone)]
pub struct FeedWsClient {
    url: String,
    topic: String,
}

impl FeedWsClient {
    pub fn new(url: &str, topic: &str) -> Self {
        Self {
            url: url.to_string(),
            topic: topic.to_string(),
        }
    }

    /// Connect and run the read loop with automatic reconnection until shutdown.
    /// Connection status and decoded ticks both go through `feed_tx`.
    pub async fn connect_and_run(
        &self,
        feed_tx: mpsc::Sender<FeedEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), FeedError> {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
        );
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let result = self
                .connect_once(&feed_tx, &mut shutdown, &mut backoff)
                .await;
            let _ = feed_tx
                .send(FeedEvent::Status(WsConnectionStatus::Disconnected))
                .await;
            match result {
                Ok(()) => break,
                Err(FeedError::ChannelClosed) => return Err(FeedError::ChannelClosed),
                Err(e) => {
                    tracing::warn!(url = %self.url, attempt, error = %e, "Feed connection lost");

                    let delay = backoff.next_delay();
                    let _ = feed_tx
                        .send(FeedEvent::Status(WsConnectionStatus::Reconnecting {
                            attempt,
                            delay_ms: delay.as_millis() as u64,
                        }))
                        .await;

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue,
                        _ = shutdown.changed() => {
                            tracing::info!("Shutdown during reconnect");
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn connect_once(
        &self,
        feed_tx: &mpsc::Sender<FeedEvent>,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut ExponentialBackoff,
    ) -> Result<(), FeedError> {
        tracing::info!(url = %self.url, "Connecting to feed");

        let (ws_stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| FeedError::WebSocket(format!("connect failed: {}", e)))?;
        backoff.reset();

        let (mut write, mut read) = ws_stream.split();

        // Report open before subscribing, listeners treat it as the connected signal
        feed_tx
            .send(FeedEvent::Status(WsConnectionStatus::Connected))
            .await
            .map_err(|_| FeedError::ChannelClosed)?;
        write
            .send(tungstenite::Message::Text(self.topic.clone()))
            .await
            .map_err(|e| FeedError::WebSocket(format!("subscribe failed: {}", e)))?;
        tracing::info!(topic = %self.topic, "Feed subscribed");

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match decode_ticks(&text) {
                                Ok(ticks) => {
                                    for tick in ticks {
                                        feed_tx
                                            .send(FeedEvent::Tick(tick))
                                            .await
                                            .map_err(|_| FeedError::ChannelClosed)?;
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!(error = %e, "Failed to parse feed message");
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            return Err(FeedError::WebSocket(format!("closed by server: {:?}", frame)));
                        }
                        Some(Ok(_)) => {
                            // tokio-tungstenite answers pings on its own
                        }
                        Some(Err(e)) => {
                            return Err(FeedError::WebSocket(format!("read error: {}", e)));
                        }
                        None => {
                            return Err(FeedError::WebSocket("stream ended".to_string()));
                        }
                    }
                }
                _ = shutdown.changed() => {
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return Ok(());
                }
            }
        }
    }
}
