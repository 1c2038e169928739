pub mod buffer;
pub mod builder;
pub mod engine;
pub mod latency;
pub mod scheduler;

pub use buffer::TickBuffer;
pub use builder::{BarBuilder, BoundaryOutcome, SkipReason};
pub use engine::AggregationEngine;
pub use latency::LatencyEstimator;
pub use scheduler::{boundary_for, ArmedBoundary, Boundary, BoundaryScheduler, BoundaryTimer};
