//! The `credential_usage` event collection and the four per-type
//! credential collections, modeled as opaque trait boundaries. The
//! pipeline never assumes a particular store — the PocketBase-style
//! record store this ships against is an external collaborator, out of
//! scope for this crate.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use meridian_error::StoreError;

use crate::credential_type::CredentialType;
use crate::event::EventRecord;
use crate::summary::CredentialSummary;

/// Append-only `credential_usage` collection.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a batch of records. Returns one result per input record,
    /// in the same order, so the batch writer can count per-record
    /// successes and failures independently.
    async fn save_batch(&self, records: &[EventRecord]) -> Vec<Result<(), StoreError>>;

    /// Read up to `limit` of the most recent events for a credential,
    /// ordered by `timestamp` descending, for the Stats Aggregator to
    /// fold over.
    async fn recent_events(
        &self,
        credential_type: CredentialType,
        credential_id: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, StoreError>;
}

/// The four `tokens` / `dev_tokens` / `api_keys` / `security_keys`
/// collections, addressed uniformly by `CredentialType`.
#[async_trait]
pub trait CredentialCollections: Send + Sync {
    /// Write the rolled-up summary fields back onto the credential
    /// record identified by `(credential_type, credential_id)`. Read-modify-write,
    /// last-writer-wins across concurrent aggregations — acceptable
    /// because the aggregation is idempotent over the same input set.
    async fn update_summary(
        &self,
        credential_type: CredentialType,
        credential_id: &str,
        summary: CredentialSummary,
    ) -> Result<(), StoreError>;
}

/// In-memory stand-in for the record store, backing unit tests and the
/// demo binary. Not meant for production use — there is no eviction, no
/// durability, and no indexing beyond a linear scan.
#[derive(Default)]
pub struct InMemoryStore {
    events: Mutex<Vec<EventRecord>>,
    summaries: Mutex<HashMap<(CredentialType, String), CredentialSummary>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every event currently stored, for test assertions.
    #[must_use]
    pub fn all_events(&self) -> Vec<EventRecord> {
        self.events.lock().clone()
    }

    /// Read back the summary written for a credential, if any.
    #[must_use]
    pub fn summary_for(
        &self,
        credential_type: CredentialType,
        credential_id: &str,
    ) -> Option<CredentialSummary> {
        self.summaries
            .lock()
            .get(&(credential_type, credential_id.to_string()))
            .cloned()
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn save_batch(&self, records: &[EventRecord]) -> Vec<Result<(), StoreError>> {
        let mut guard = self.events.lock();
        guard.extend(records.iter().cloned());
        records.iter().map(|_| Ok(())).collect()
    }

    async fn recent_events(
        &self,
        credential_type: CredentialType,
        credential_id: &str,
        limit: usize,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let guard = self.events.lock();
        let mut matching: Vec<EventRecord> = guard
            .iter()
            .filter(|r| {
                r.event.credential_type == credential_type && r.event.credential_id == credential_id
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.event.timestamp.cmp(&a.event.timestamp));
        matching.truncate(limit);
        Ok(matching)
    }
}

#[async_trait]
impl CredentialCollections for InMemoryStore {
    async fn update_summary(
        &self,
        credential_type: CredentialType,
        credential_id: &str,
        summary: CredentialSummary,
    ) -> Result<(), StoreError> {
        self.summaries
            .lock()
            .insert((credential_type, credential_id.to_string()), summary);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use chrono::Utc;

    fn sample_record(credential_id: &str) -> EventRecord {
        EventRecord::new(Event {
            credential_type: CredentialType::ApiKey,
            credential_id: credential_id.into(),
            user_id: "u1".into(),
            service: "openai".into(),
            endpoint: "/v1/x".into(),
            method: "POST".into(),
            status_code: 200,
            response_time_ms: 10,
            tokens_used: 0,
            request_size: 0,
            response_size: 0,
            error_type: None,
            error_message: None,
            timestamp: Utc::now(),
            metadata: None,
        })
    }

    #[tokio::test]
    async fn save_and_read_back() {
        let store = InMemoryStore::new();
        let records = vec![sample_record("ak_1"), sample_record("ak_2")];
        let results = store.save_batch(&records).await;
        assert!(results.iter().all(Result::is_ok));

        let read = store.recent_events(CredentialType::ApiKey, "ak_1", 10).await.unwrap();
        assert_eq!(read.len(), 1);
    }
}
