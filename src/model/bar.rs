use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::model::tick::Tick;

/// One closed OHLCV interval. `epoch` is the interval open time in ms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: String,
    pub epoch: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Build a bar from the open reference price and the ticks inside the interval.
    ///
    /// Returns `None` when `changes` is empty, since high/low/close are undefined,
    /// or when `epoch` has no calendar representation.
    pub fn from_changes(epoch: u64, open: f64, changes: &[Tick]) -> Option<Self> {
        let last = changes.last()?;
        let timestamp = iso_timestamp(epoch)?;
        let mut high = f64::MIN;
        let mut low = f64::MAX;
        let mut volume = 0.0;
        for tick in changes {
            high = high.max(tick.price);
            low = low.min(tick.price);
            volume += tick.size;
        }
        Some(Self {
            timestamp,
            epoch,
            open,
            high,
            low,
            close: last.price,
            volume,
        })
    }
}

/// Format epoch milliseconds as `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso_timestamp(epoch_ms: u64) -> Option<String> {
    i64::try_from(epoch_ms)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_from_changes_basics() {
        let changes = vec![
            Tick::new(60_010, 100.0, 1.0),
            Tick::new(60_020, 105.0, 2.0),
            Tick::new(60_030, 95.0, 1.0),
        ];
        let bar = Bar::from_changes(60_000, 99.0, &changes).unwrap();
        assert_eq!(bar.epoch, 60_000);
        assert_eq!(bar.timestamp, "1970-01-01T00:01:00.000Z");
        assert!((bar.open - 99.0).abs() < f64::EPSILON);
        assert!((bar.high - 105.0).abs() < f64::EPSILON);
        assert!((bar.low - 95.0).abs() < f64::EPSILON);
        assert!((bar.close - 95.0).abs() < f64::EPSILON);
        assert!((bar.volume - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_changes_produce_no_bar() {
        assert!(Bar::from_changes(60_000, 100.0, &[]).is_none());
    }

    #[test]
    fn iso_timestamp_keeps_millis() {
        assert_eq!(
            iso_timestamp(1_704_067_200_123).as_deref(),
            Some("2024-01-01T00:00:00.123Z")
        );
    }

    #[test]
    fn epoch_beyond_calendar_produces_no_bar() {
        let changes = vec![Tick::new(100_000_000_000_000_010, 1.0, 1.0)];
        assert!(iso_timestamp(100_000_000_000_000_000).is_none());
        assert!(Bar::from_changes(100_000_000_000_000_000, 1.0, &changes).is_none());
    }
}
