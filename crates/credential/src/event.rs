use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Map;

use crate::credential_type::CredentialType;

/// Synthetic HTTP verb recorded for SSH key usage, since SSH connections
/// have no real method. `total_connections` on a security key's summary
/// counts events whose method equals this constant.
pub const SSH_CONNECT: &str = "SSH_CONNECT";

/// One observation of a credential being used, successful or not.
/// Immutable once constructed; the Tracker only ever clones or moves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub credential_type: CredentialType,
    pub credential_id: String,
    pub user_id: String,
    /// Normalized service tag, e.g. `"openai"`, `"pocketbase"`, `"unknown"`.
    pub service: String,
    pub endpoint: String,
    /// HTTP method, or [`SSH_CONNECT`] for security-key connections.
    pub method: String,
    /// `0` indicates a transport failure before any response was received.
    pub status_code: u16,
    pub response_time_ms: u64,
    pub tokens_used: u64,
    pub request_size: u64,
    pub response_size: u64,
    pub error_type: Option<ErrorType>,
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<Map<String, serde_json::Value>>,
}

/// Closed set of error classifications an `Event` can carry, per the error
/// handling design — never a bare string tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Transport failed before any response was produced (`status_code == 0`).
    RequestError,
    /// A response was received with `status_code >= 400`.
    HttpError,
}

impl Event {
    /// A request counts as successful iff its status code is in
    /// `[200, 400)`. Transport failures (`status_code == 0`) and any
    /// `4xx`/`5xx` response count as failures.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status_code)
    }

    /// Whether this event should increment a security key's
    /// `total_connections` counter.
    #[must_use]
    pub fn is_ssh_connection(&self) -> bool {
        self.credential_type == CredentialType::SecurityKey && self.method == SSH_CONNECT
    }
}

/// One row in the append-only `credential_usage` collection: an `Event`
/// plus the store-generated primary key and creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    #[serde(flatten)]
    pub event: Event,
    pub created_at: DateTime<Utc>,
}

impl EventRecord {
    /// Stamp a fresh record from an event, generating a new primary key.
    /// Called once per event per write attempt — a retried batch write
    /// calls this again for records it re-saves, which is the source of
    /// the accepted at-most-once-with-retry duplication risk (see
    /// `DESIGN.md`).
    #[must_use]
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(status: u16) -> Event {
        Event {
            credential_type: CredentialType::ApiKey,
            credential_id: "ak_42".into(),
            user_id: "user_1".into(),
            service: "openai".into(),
            endpoint: "/v1/chat/completions".into(),
            method: "POST".into(),
            status_code: status,
            response_time_ms: 420,
            tokens_used: 137,
            request_size: 800,
            response_size: 1500,
            error_type: None,
            error_message: None,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    #[test]
    fn success_boundary_is_200_inclusive_400_exclusive() {
        assert!(sample_event(200).is_success());
        assert!(sample_event(399).is_success());
        assert!(!sample_event(400).is_success());
        assert!(!sample_event(0).is_success());
        assert!(!sample_event(199).is_success());
    }

    #[test]
    fn ssh_connection_requires_both_type_and_method() {
        let mut event = sample_event(200);
        event.credential_type = CredentialType::SecurityKey;
        event.method = SSH_CONNECT.to_string();
        assert!(event.is_ssh_connection());

        event.method = "GET".to_string();
        assert!(!event.is_ssh_connection());
    }
}
