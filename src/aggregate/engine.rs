use std::fmt::Debug;

use tokio::time::Instant;

use crate::aggregate::buffer::TickBuffer;
use crate::aggregate::builder::{BarBuilder, BoundaryOutcome};
use crate::aggregate::latency::LatencyEstimator;
use crate::aggregate::scheduler::{Boundary, BoundaryScheduler};
use crate::clock::{Clock, SystemClock};
use crate::event::AggregateEvent;
use crate::model::tick::Tick;

/// Aggregates one tick stream into bars at one resolution.
///
/// Every ingested tick re-arms a single boundary timer, padded by the smoothed
/// feed latency. The owner waits on [`AggregationEngine::next_deadline`] and
/// calls [`AggregationEngine::fire_due`] once it passes; events go to `handler`.
pub struct AggregationEngine<H, C = SystemClock>
where
    H: FnMut(AggregateEvent),
    C: Clock,
{
    buffer: TickBuffer,
    scheduler: BoundaryScheduler,
    builder: BarBuilder,
    clock: C,
    handler: H,
}

impl<H, C> Debug for AggregationEngine<H, C>
where
    H: FnMut(AggregateEvent),
    C: Clock,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(stringify!(AggregationEngine))
            .field("buffer_len", &self.buffer.len())
            .field("scheduler", &self.scheduler)
            .field("builder", &self.builder)
            .finish()
    }
}

impl<H> AggregationEngine<H, SystemClock>
where
    H: FnMut(AggregateEvent),
{
    pub fn new(resolution_ms: u64, handler: H) -> Self {
        Self::with_clock(resolution_ms, SystemClock, handler)
    }
}

impl<H, C> AggregationEngine<H, C>
where
    H: FnMut(AggregateEvent),
    C: Clock,
{
    pub fn with_clock(resolution_ms: u64, clock: C, handler: H) -> Self {
        assert!(resolution_ms > 0, "resolution_ms must be > 0");
        Self {
            buffer: TickBuffer::new(),
            scheduler: BoundaryScheduler::new(resolution_ms, LatencyEstimator::default()),
            builder: BarBuilder::new(resolution_ms),
            clock,
            handler,
        }
    }

    /// Smoothed feed latency in ms.
    pub fn latency(&self) -> i64 {
        self.scheduler.latency_ms()
    }

    pub fn is_initialized(&self) -> bool {
        self.builder.is_initialized()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn pending_open_time(&self) -> Option<u64> {
        self.scheduler.armed().map(|a| a.open_time)
    }

    /// Transport is open; pass it through to listeners.
    pub fn on_connected(&mut self) {
        (self.handler)(AggregateEvent::Connected);
    }

    pub fn ingest(&mut self, tick: Tick) -> Boundary {
        self.ingest_at(tick, Instant::now())
    }

    /// Append `tick` and re-arm the boundary timer relative to `now`.
    pub fn ingest_at(&mut self, tick: Tick, now: Instant) -> Boundary {
        self.buffer.append(tick);
        let now_ms = self.clock.now_ms();
        self.scheduler.on_tick(&tick, now_ms, now)
    }

    /// Fire the armed boundary if its deadline is not after `now`.
    pub fn fire_due(&mut self, now: Instant) -> Option<BoundaryOutcome> {
        let armed = self.scheduler.take_due(now)?;
        Some(self.on_boundary(armed.open_time))
    }

    /// Close the bar opened at `open_time` and emit whatever it produced.
    pub fn on_boundary(&mut self, open_time: u64) -> BoundaryOutcome {
        let outcome = self.builder.on_boundary(open_time, &mut self.buffer);
        match &outcome {
            BoundaryOutcome::Initialized => {
                tracing::info!(open_time, "Aggregator initialized");
                (self.handler)(AggregateEvent::Initialized);
            }
            BoundaryOutcome::Bar(bar) => {
                tracing::debug!(
                    epoch = bar.epoch,
                    close = bar.close,
                    volume = bar.volume,
                    buffered = self.buffer.len(),
                    "Bar closed"
                );
                (self.handler)(AggregateEvent::Bar(bar.clone()));
            }
            BoundaryOutcome::Skipped(reason) => {
                tracing::debug!(open_time, reason = ?reason, "Bar skipped");
            }
        }
        outcome
    }

    /// Disarm any pending boundary so nothing fires after teardown.
    pub fn shutdown(&mut self) {
        if let Some(armed) = self.scheduler.disarm() {
            tracing::debug!(open_time = armed.open_time, "Pending boundary cancelled");
        }
    }
}
