use serde::{Deserialize, Serialize};

/// A single trade observation from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp_ms: u64,
    pub price: f64,
    pub size: f64,
}

impl Tick {
    pub fn new(timestamp_ms: u64, price: f64, size: f64) -> Self {
        Self {
            timestamp_ms,
            price,
            size,
        }
    }
}
