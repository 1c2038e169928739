use std::time::Duration;

use tokio::time::Instant;

use crate::aggregate::latency::LatencyEstimator;
use crate::model::tick::Tick;

/// Where a tick sits relative to its bar, and how long until that bar closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary {
    /// Open time of the bar the tick falls into.
    pub open_time: u64,
    /// How far into the bar the tick is.
    pub offset_ms: u64,
    /// Time until the bar closes, including latency padding.
    pub remaining_ms: u64,
}

/// Compute the boundary for `timestamp_ms`. Negative latency pads nothing.
pub fn boundary_for(timestamp_ms: u64, resolution_ms: u64, latency_ms: i64) -> Boundary {
    let offset_ms = timestamp_ms % resolution_ms;
    let open_time = timestamp_ms - offset_ms;
    let padding = u64::try_from(latency_ms).unwrap_or(0);
    Boundary {
        open_time,
        offset_ms,
        remaining_ms: (resolution_ms - offset_ms).saturating_add(padding),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmedBoundary {
    pub open_time: u64,
    pub deadline: Instant,
}

/// Single pending boundary firing. Arming always replaces what was armed before.
#[derive(Debug, Default)]
pub struct BoundaryTimer {
    armed: Option<ArmedBoundary>,
}

impl BoundaryTimer {
    /// Cancel any pending firing and schedule a new one. Returns the superseded one.
    pub fn arm(&mut self, open_time: u64, delay: Duration, now: Instant) -> Option<ArmedBoundary> {
        self.armed.replace(ArmedBoundary {
            open_time,
            deadline: now + delay,
        })
    }

    pub fn disarm(&mut self) -> Option<ArmedBoundary> {
        self.armed.take()
    }

    pub fn armed(&self) -> Option<&ArmedBoundary> {
        self.armed.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|a| a.deadline)
    }

    /// Take the pending firing if its deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> Option<ArmedBoundary> {
        match self.armed {
            Some(armed) if armed.deadline <= now => self.armed.take(),
            _ => None,
        }
    }
}

/// Re-arms the boundary timer from the newest tick on every ingest.
#[derive(Debug)]
pub struct BoundaryScheduler {
    resolution_ms: u64,
    latency: LatencyEstimator,
    timer: BoundaryTimer,
}

impl BoundaryScheduler {
    pub fn new(resolution_ms: u64, latency: LatencyEstimator) -> Self {
        assert!(resolution_ms > 0, "resolution_ms must be > 0");
        Self {
            resolution_ms,
            latency,
            timer: BoundaryTimer::default(),
        }
    }

    /// Re-estimate latency from `tick` and arm the timer for the bar it falls into.
    ///
    /// `now_ms` is the wall clock used for the delay sample, `now` the
    /// monotonic instant the deadline is measured from.
    pub fn on_tick(&mut self, tick: &Tick, now_ms: u64, now: Instant) -> Boundary {
        let delay_ms = i64::try_from(now_ms)
            .unwrap_or(i64::MAX)
            .saturating_sub(i64::try_from(tick.timestamp_ms).unwrap_or(i64::MAX));
        let latency_ms = self.latency.update(delay_ms);
        let boundary = boundary_for(tick.timestamp_ms, self.resolution_ms, latency_ms);

        let superseded = self.timer.arm(
            boundary.open_time,
            Duration::from_millis(boundary.remaining_ms),
            now,
        );
        tracing::trace!(
            open_time = boundary.open_time,
            remaining_ms = boundary.remaining_ms,
            latency_ms,
            superseded = superseded.is_some(),
            "Boundary timer armed"
        );
        boundary
    }

    pub fn latency_ms(&self) -> i64 {
        self.latency.current()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn armed(&self) -> Option<&ArmedBoundary> {
        self.timer.armed()
    }

    pub fn take_due(&mut self, now: Instant) -> Option<ArmedBoundary> {
        self.timer.take_due(now)
    }

    pub fn disarm(&mut self) -> Option<ArmedBoundary> {
        self.timer.disarm()
    }
}
