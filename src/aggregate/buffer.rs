use crate::model::tick::Tick;

/// Feed-ordered tick history, trimmed after every closed bar.
#[derive(Debug, Clone, Default)]
pub struct TickBuffer {
    ticks: Vec<Tick>,
}

impl TickBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, tick: Tick) {
        self.ticks.push(tick);
    }

    pub fn latest(&self) -> Option<&Tick> {
        self.ticks.last()
    }

    pub fn get(&self, index: usize) -> Option<&Tick> {
        self.ticks.get(index)
    }

    /// Ticks from `from_index` to the end; empty when out of range.
    pub fn slice(&self, from_index: usize) -> &[Tick] {
        self.ticks.get(from_index..).unwrap_or(&[])
    }

    /// Index of the first tick with `timestamp_ms >= at_ms`.
    pub fn first_index_at_or_after(&self, at_ms: u64) -> Option<usize> {
        self.ticks.iter().position(|t| t.timestamp_ms >= at_ms)
    }

    /// Ticks with `from_ms <= timestamp_ms < to_ms`, in feed order.
    pub fn between(&self, from_ms: u64, to_ms: u64) -> Vec<Tick> {
        self.ticks
            .iter()
            .filter(|t| t.timestamp_ms >= from_ms && t.timestamp_ms < to_ms)
            .copied()
            .collect()
    }

    /// Drop every tick before `index`. Out-of-range indices keep the last tick.
    pub fn trim_before(&mut self, index: usize) {
        let index = index.min(self.ticks.len().saturating_sub(1));
        if index > 0 {
            self.ticks.drain(..index);
        }
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> TickBuffer {
        let mut buf = TickBuffer::new();
        for (i, ts) in [100, 200, 300, 400].into_iter().enumerate() {
            buf.append(Tick::new(ts, 10.0 + i as f64, 1.0));
        }
        buf
    }

    #[test]
    fn latest_on_empty_is_none() {
        let buf = TickBuffer::new();
        assert!(buf.latest().is_none());
        assert!(buf.is_empty());
    }

    #[test]
    fn append_and_latest() {
        let buf = filled();
        assert_eq!(buf.len(), 4);
        assert_eq!(buf.latest().map(|t| t.timestamp_ms), Some(400));
        assert_eq!(buf.slice(2).len(), 2);
        assert!(buf.slice(9).is_empty());
    }

    #[test]
    fn range_queries() {
        let buf = filled();
        assert_eq!(buf.first_index_at_or_after(150), Some(1));
        assert_eq!(buf.first_index_at_or_after(200), Some(1));
        assert_eq!(buf.first_index_at_or_after(401), None);
        let between = buf.between(200, 400);
        assert_eq!(between.len(), 2);
        assert_eq!(between[0].timestamp_ms, 200);
        assert_eq!(between[1].timestamp_ms, 300);
    }

    #[test]
    fn trim_before_drops_prefix() {
        let mut buf = filled();
        buf.trim_before(2);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.get(0).map(|t| t.timestamp_ms), Some(300));

        buf.trim_before(0);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn trim_past_end_keeps_last_tick() {
        let mut buf = filled();
        buf.trim_before(10);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.latest().map(|t| t.timestamp_ms), Some(400));

        let mut empty = TickBuffer::new();
        empty.trim_before(3);
        assert!(empty.is_empty());
    }
}
