use chrono::DateTime;
use serde::Deserialize;

use crate::error::FeedError;
use crate::model::tick::Tick;

pub const TRADE_TABLE: &str = "trade";
pub const INSERT_ACTION: &str = "insert";

/// Deserialize a number or numeric string to `f64`; anything else is `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    let parsed = match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    Ok(parsed.filter(|f| f.is_finite()))
}

/// Deserialize an RFC 3339 string or integer epoch-ms value to epoch ms.
/// Integers outside the representable date range are `None`.
pub fn lenient_timestamp_ms<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(deserializer)?;
    Ok(match v {
        serde_json::Value::Number(n) => n.as_u64().filter(|&ms| {
            i64::try_from(ms)
                .ok()
                .and_then(DateTime::from_timestamp_millis)
                .is_some()
        }),
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .and_then(|dt| u64::try_from(dt.timestamp_millis()).ok()),
        _ => None,
    })
}

/// One element of a trade table update. Any field may be absent.
#[derive(Debug, Default, Deserialize)]
pub struct TradeEntry {
    #[serde(default, deserialize_with = "lenient_timestamp_ms")]
    pub timestamp: Option<u64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub size: Option<f64>,
}

impl TradeEntry {
    pub fn to_tick(&self) -> Option<Tick> {
        Some(Tick::new(self.timestamp?, self.price?, self.size?))
    }
}

/// Table update envelope, e.g. `{"table":"trade","action":"insert","data":[...]}`.
#[derive(Debug, Default, Deserialize)]
pub struct FeedFrame {
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl FeedFrame {
    pub fn parse(text: &str) -> Result<Self, FeedError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_trade_insert(&self) -> bool {
        self.table.as_deref() == Some(TRADE_TABLE) && self.action.as_deref() == Some(INSERT_ACTION)
    }

    /// Complete ticks carried by a trade insert. Other frames, and entries
    /// missing a timestamp, price or size, yield nothing.
    pub fn ticks(&self) -> Vec<Tick> {
        if !self.is_trade_insert() {
            return Vec::new();
        }
        let Some(serde_json::Value::Array(entries)) = &self.data else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| TradeEntry::deserialize(entry).ok())
            .filter_map(|entry| entry.to_tick())
            .collect()
    }
}

/// Decode one raw feed message into ticks.
pub fn decode_ticks(text: &str) -> Result<Vec<Tick>, FeedError> {
    Ok(FeedFrame::parse(text)?.ticks())
}
