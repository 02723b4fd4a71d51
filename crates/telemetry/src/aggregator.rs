use std::collections::HashMap;

use chrono::{DateTime, Utc};
use meridian_credential::{CredentialCollections, CredentialSummary, CredentialType, EventRecord, EventStore};
use meridian_error::AggregatorError;

/// Read caps for [`aggregate_stats`] and [`aggregate_all_user_stats`],
/// overridable per call rather than hard-coded. Defaults match the
/// values the pipeline shipped with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Cap applied by `aggregate_stats` / `update_credential_collection_stats`.
    pub single_credential_read_cap: usize,
    /// Larger cap applied per credential by `aggregate_all_user_stats`.
    pub bulk_read_cap: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self { single_credential_read_cap: 10_000, bulk_read_cap: 50_000 }
    }
}

/// Folded per-credential counters. Read failures against the event store
/// produce a zero-valued `CredentialStats` rather than an error — treated
/// as "no data yet" so the surrounding handler can respond with an empty
/// view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CredentialStats {
    pub total_requests: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// In `[0, 1]`. `0.0` when `total_requests == 0`.
    pub success_rate: f64,
    pub total_tokens: u64,
    /// Mean of `response_time_ms` across the folded window. `0.0` when
    /// `total_requests == 0`.
    pub avg_response_time_ms: f64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub total_connections: u64,
    /// `true` when the read hit its cap, meaning events older than the
    /// oldest one folded here were not considered — the aggregate may be
    /// silently partial beyond that point. Resolves the open question
    /// about `aggregateStats`' fixed read cap (see `DESIGN.md`).
    pub truncated: bool,
}

fn fold(records: &[EventRecord], read_cap: usize) -> CredentialStats {
    let total_requests = records.len() as u64;
    if total_requests == 0 {
        return CredentialStats::default();
    }

    let success_count = records.iter().filter(|r| r.event.is_success()).count() as u64;
    let failure_count = total_requests - success_count;
    let total_tokens: u64 = records.iter().map(|r| r.event.tokens_used).sum();
    let response_time_sum: u64 = records.iter().map(|r| r.event.response_time_ms).sum();
    let total_connections = records.iter().filter(|r| r.event.is_ssh_connection()).count() as u64;
    let last_used_at = records.iter().map(|r| r.event.timestamp).max();

    CredentialStats {
        total_requests,
        success_count,
        failure_count,
        success_rate: success_count as f64 / total_requests as f64,
        total_tokens,
        avg_response_time_ms: response_time_sum as f64 / total_requests as f64,
        last_used_at,
        total_connections,
        truncated: records.len() == read_cap,
    }
}

/// Read the latest up-to-`read_cap` events for `(credential_type,
/// credential_id)` ordered by `timestamp DESC` and fold them in memory.
/// Pure: calling this twice with no intervening new events yields an
/// identical result.
pub async fn aggregate_stats(
    credential_type: CredentialType,
    credential_id: &str,
    store: &dyn EventStore,
    config: AggregatorConfig,
) -> CredentialStats {
    match store
        .recent_events(credential_type, credential_id, config.single_credential_read_cap)
        .await
    {
        Ok(records) => fold(&records, config.single_credential_read_cap),
        Err(_) => CredentialStats::default(),
    }
}

/// Marker trait for a store backing both the event collection and the
/// per-type credential collections, so the aggregator's write path can
/// take a single trait object instead of two.
pub trait TelemetryStore: EventStore + CredentialCollections {}
impl<T: EventStore + CredentialCollections + ?Sized> TelemetryStore for T {}

/// Run `aggregate_stats` then write `total_requests`, `total_tokens_used`,
/// `success_rate`, `last_used_at`, and (only for `security_key`
/// credentials) `total_connections` back onto the credential record.
/// Idempotent over the same input set — concurrent calls for the same
/// credential may race, and last-writer-wins is accepted.
pub async fn update_credential_collection_stats(
    credential_type: CredentialType,
    credential_id: &str,
    store: &dyn TelemetryStore,
    config: AggregatorConfig,
) -> Result<CredentialStats, AggregatorError> {
    let stats = aggregate_stats(credential_type, credential_id, store, config).await;

    let summary = CredentialSummary {
        total_requests: stats.total_requests,
        total_tokens_used: stats.total_tokens,
        success_rate: stats.success_rate,
        last_used_at: stats.last_used_at,
        total_connections: if credential_type == CredentialType::SecurityKey {
            stats.total_connections
        } else {
            0
        },
    };

    store.update_summary(credential_type, credential_id, summary).await?;

    Ok(stats)
}

/// Convenience entry point for callers that only have a wire-format type
/// tag (e.g. an HTTP handler reading a path parameter), rather than an
/// already-parsed `CredentialType`. Unknown tags return
/// `AggregatorError::UnknownCredentialType` and write nothing.
pub async fn update_credential_collection_stats_by_tag(
    credential_type_tag: &str,
    credential_id: &str,
    store: &dyn TelemetryStore,
    config: AggregatorConfig,
) -> Result<CredentialStats, AggregatorError> {
    let credential_type = CredentialType::parse(credential_type_tag)
        .ok_or_else(|| AggregatorError::UnknownCredentialType(credential_type_tag.to_string()))?;
    update_credential_collection_stats(credential_type, credential_id, store, config).await
}

/// Bulk variant: fold stats for every `(credential_type, credential_id)`
/// pair in `credentials`, keyed `"{type}:{id}"`. The caller supplies the
/// set of credentials owned by the user — enumerating a user's
/// credentials is a credential-CRUD concern and stays out of scope here —
/// and each read is bounded by `config.bulk_read_cap` rather than the
/// smaller single-credential cap.
pub async fn aggregate_all_user_stats(
    credentials: &[(CredentialType, String)],
    store: &dyn EventStore,
    config: AggregatorConfig,
) -> HashMap<String, CredentialStats> {
    let bulk_config = AggregatorConfig {
        single_credential_read_cap: config.bulk_read_cap,
        bulk_read_cap: config.bulk_read_cap,
    };

    let mut results = HashMap::with_capacity(credentials.len());
    for (credential_type, credential_id) in credentials {
        let stats = aggregate_stats(*credential_type, credential_id, store, bulk_config).await;
        results.insert(format!("{}:{credential_id}", credential_type.wire_tag()), stats);
    }
    results
}
