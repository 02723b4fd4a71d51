//! The Tracker Core — bounded buffer, dispatcher loop, bulkhead-capped
//! worker pool, retry-with-backoff batch writer, shutdown coordinator,
//! and lock-free counters — plus the Stats Aggregator that rolls event
//! history up onto credential records.

mod aggregator;
mod batch;
mod buffer;
mod config;
mod stats;
mod tracker;

pub use aggregator::{
    aggregate_all_user_stats, aggregate_stats, update_credential_collection_stats,
    update_credential_collection_stats_by_tag, AggregatorConfig, CredentialStats, TelemetryStore,
};
pub use config::TrackerConfig;
pub use stats::{TrackerStats, TrackerStatsSnapshot};
pub use tracker::Tracker;

pub use meridian_error::{AggregatorError, ShutdownError, StoreError, TrackerError};
