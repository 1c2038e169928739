use crate::aggregate::buffer::TickBuffer;
use crate::model::bar::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// First tick in the interval sits exactly on the open, so the true open is unknown.
    AmbiguousOpen,
    /// No buffered tick precedes the interval to serve as the open price.
    NoPriorTick,
    /// No buffered ticks inside `[open_time, close_time)`.
    EmptyInterval,
    /// Boundary is not after the last emitted bar.
    Stale,
    /// Interval end or open time falls outside the representable time range.
    OutOfRange,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryOutcome {
    Initialized,
    Bar(Bar),
    Skipped(SkipReason),
}

/// Turns a fired boundary into a bar and trims the buffer behind it.
#[derive(Debug)]
pub struct BarBuilder {
    resolution_ms: u64,
    initialized: bool,
    last_epoch: Option<u64>,
}

impl BarBuilder {
    pub fn new(resolution_ms: u64) -> Self {
        assert!(resolution_ms > 0, "resolution_ms must be > 0");
        Self {
            resolution_ms,
            initialized: false,
            last_epoch: None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn last_epoch(&self) -> Option<u64> {
        self.last_epoch
    }

    /// Close the bar opened at `open_time`.
    ///
    /// The first boundary ever only initializes: no prior close exists to open from.
    /// Skips leave the buffer as it was.
    pub fn on_boundary(&mut self, open_time: u64, buffer: &mut TickBuffer) -> BoundaryOutcome {
        if !self.initialized {
            self.initialized = true;
            return BoundaryOutcome::Initialized;
        }
        if self.last_epoch.is_some_and(|last| open_time <= last) {
            return BoundaryOutcome::Skipped(SkipReason::Stale);
        }

        let Some(close_time) = open_time.checked_add(self.resolution_ms) else {
            return BoundaryOutcome::Skipped(SkipReason::OutOfRange);
        };
        let changes = buffer.between(open_time, close_time);

        let Some(first_index) = buffer.first_index_at_or_after(open_time) else {
            return BoundaryOutcome::Skipped(SkipReason::EmptyInterval);
        };
        let Some(first) = buffer.get(first_index) else {
            return BoundaryOutcome::Skipped(SkipReason::EmptyInterval);
        };
        if first.timestamp_ms == open_time {
            return BoundaryOutcome::Skipped(SkipReason::AmbiguousOpen);
        }
        // Last known price before the boundary: normally the previous bar's close.
        let Some(open) = first_index
            .checked_sub(1)
            .and_then(|i| buffer.get(i))
            .map(|t| t.price)
        else {
            return BoundaryOutcome::Skipped(SkipReason::NoPriorTick);
        };

        if changes.is_empty() {
            return BoundaryOutcome::Skipped(SkipReason::EmptyInterval);
        }
        let Some(bar) = Bar::from_changes(open_time, open, &changes) else {
            return BoundaryOutcome::Skipped(SkipReason::OutOfRange);
        };

        // Keep the next bar's ticks plus the one tick before them.
        match buffer.first_index_at_or_after(close_time) {
            Some(next_index) => buffer.trim_before(next_index.saturating_sub(1)),
            None => buffer.trim_before(buffer.len()),
        }
        self.last_epoch = Some(open_time);
        BoundaryOutcome::Bar(bar)
    }
}
