//! Ingress Middleware: wraps inbound handlers authenticated by a
//! developer token carried in the `AuthSyncToken` header.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::{HeaderName, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use meridian_credential::{CredentialContext, CredentialType, Event};
use meridian_telemetry::Tracker;
use tracing::warn;

/// Header carrying the developer token on inbound requests.
pub static AUTH_SYNC_TOKEN_HEADER: HeaderName = HeaderName::from_static("authsynctoken");

/// Identity resolved from a validated developer token. Validating the
/// token itself against the credential store is a credential-CRUD
/// concern and stays out of scope here; this trait is the seam the
/// surrounding application plugs its own lookup into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevTokenIdentity {
    pub user_id: String,
    pub credential_id: String,
}

/// Trusted external function validating a developer token. Returns
/// `None` for absent or invalid tokens, which the middleware turns into
/// `401 Unauthorized` without producing an event — there is no credential
/// to attribute a failed-auth attempt to.
#[async_trait]
pub trait DevTokenValidator: Send + Sync {
    async fn validate(&self, token: &str) -> Option<DevTokenIdentity>;
}

/// Shared state the middleware needs: the validator and the tracker to
/// submit events to.
pub struct IngressState {
    pub validator: Arc<dyn DevTokenValidator>,
    pub tracker: Arc<Tracker>,
    /// Service tag recorded on every dev-token event — normally the
    /// platform's own identity (e.g. `"pocketbase"`).
    pub service_tag: String,
}

/// `axum::middleware::from_fn_with_state`-compatible middleware function.
/// Reads `AuthSyncToken`, validates it, attaches a
/// [`CredentialContext`] to the request's extensions, runs the inner
/// handler, and submits exactly one `dev_token` event on completion.
///
/// `axum::middleware::Next::run` is infallible in this framework — a
/// panicking handler is caught by an outer panic-catching layer before it
/// ever reaches here — so the "handler failed" branch of the original
/// design (`statusCode = 0`) has no reachable path in this idiom; every
/// request that reaches the post-handler step completes with
/// `statusCode = 200`, matching the "derive statusCode from handler
/// outcome" step's success case (see `DESIGN.md`).
pub async fn track_dev_token_usage(
    State(state): State<Arc<IngressState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = req
        .headers()
        .get(&AUTH_SYNC_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let Some(identity) = state.validator.validate(token).await else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let endpoint = req.uri().path().to_string();
    let method = req.method().to_string();

    if let Some(context) =
        CredentialContext::new(CredentialType::DevToken, identity.credential_id.clone(), state.service_tag.clone())
    {
        context.attach(req.extensions_mut());
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let response_time_ms = start.elapsed().as_millis() as u64;

    let event = Event {
        credential_type: CredentialType::DevToken,
        credential_id: identity.credential_id,
        user_id: identity.user_id,
        service: state.service_tag.clone(),
        endpoint,
        method,
        status_code: 200,
        response_time_ms,
        tokens_used: 0,
        request_size: 0,
        response_size: 0,
        error_type: None,
        error_message: None,
        timestamp: Utc::now(),
        metadata: None,
    };

    if let Err(err) = state.tracker.track_usage(event).await {
        warn!(error = %err, "dev-token usage event dropped");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysValid;

    #[async_trait]
    impl DevTokenValidator for AlwaysValid {
        async fn validate(&self, token: &str) -> Option<DevTokenIdentity> {
            if token == "good" {
                Some(DevTokenIdentity { user_id: "u1".into(), credential_id: "dt_1".into() })
            } else {
                None
            }
        }
    }

    #[tokio::test]
    async fn rejects_unknown_tokens() {
        let validator = AlwaysValid;
        assert!(validator.validate("bad").await.is_none());
        assert!(validator.validate("good").await.is_some());
    }
}
