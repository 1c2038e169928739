//! Latency-compensated OHLCV bar aggregation from a live trade feed.
//!
//! [`aggregate::AggregationEngine`] buffers ticks, pads each bar boundary by
//! the smoothed feed latency and emits [`event::AggregateEvent`]s.
//! [`feed::FeedWsClient`] and [`runtime::run_aggregator`] wire it to a
//! WebSocket trade stream.

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod error;
pub mod event;
pub mod feed;
pub mod model;
pub mod runtime;
