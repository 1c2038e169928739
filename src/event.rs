use crate::model::bar::Bar;
use crate::model::tick::Tick;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WsConnectionStatus {
    Connected,
    Disconnected,
    Reconnecting { attempt: u32, delay_ms: u64 },
}

/// What the transport adapter hands to the aggregation task.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Status(WsConnectionStatus),
    Tick(Tick),
}

/// What the aggregation engine raises for listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregateEvent {
    Connected,
    Initialized,
    Bar(Bar),
}

impl AggregateEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Initialized => "initialized",
            Self::Bar(_) => "bar",
        }
    }
}
