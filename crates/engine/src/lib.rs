//! The daily ops health engine: record normalization, per-day KPI
//! aggregation, rolling-baseline tracking, and anomaly classification.
//!
//! Everything here is deterministic given its inputs; storage and delivery
//! live behind the `ops-insight-core` traits.

pub mod aggregator;
pub mod baseline;
pub mod classifier;
pub mod normalizer;
pub mod pipeline;

pub use aggregator::aggregate_day;
pub use baseline::{BaselineTracker, BaselineWindow};
pub use classifier::classify;
pub use normalizer::{NormalizedBatch, RecordNormalizer};
pub use pipeline::DailyPipeline;
