pub mod types;
pub mod ws;

pub use types::{decode_ticks, FeedFrame, TradeEntry};
pub use ws::{ExponentialBackoff, FeedWsClient};
