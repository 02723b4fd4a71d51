use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rolled-up counters maintained on a credential's own record by the
/// Stats Aggregator. `total_connections` is only meaningful for
/// `security_key` credentials; it is `0` for everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSummary {
    pub total_requests: u64,
    pub total_tokens_used: u64,
    /// In `[0, 1]`. `0.0` when `total_requests == 0`.
    pub success_rate: f64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub total_connections: u64,
}

impl CredentialSummary {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_requests: 0,
            total_tokens_used: 0,
            success_rate: 0.0,
            last_used_at: None,
            total_connections: 0,
        }
    }
}

impl Default for CredentialSummary {
    fn default() -> Self {
        Self::empty()
    }
}
