//! Egress Transport Wrapper: a `reqwest_middleware::Middleware`
//! that instruments every outbound round-trip carrying a credential
//! context, and is a pure passthrough for everything else.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use http::Extensions;
use meridian_credential::{detect_service, get_credential_context, ErrorType, Event, ParserRegistry, RequestDescriptor};
use meridian_telemetry::Tracker;
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next, Result as MiddlewareResult};
use tracing::{debug, warn};

/// Extracts a `userId` from the request-scoped extensions when the
/// credential context itself didn't carry one. Pluggable so the binary
/// wiring this crate together can supply whatever session/auth lookup it
/// already has, as a fallback for resolving the user attributed to an
/// outbound call.
pub type UserIdExtractor = Arc<dyn Fn(&Extensions) -> Option<String> + Send + Sync>;

/// Wraps the outbound `reqwest::Client` so every round-trip with an
/// attached [`meridian_credential::CredentialContext`] produces exactly
/// one [`Event`], submitted to the [`Tracker`] fire-and-forget. Requests
/// with no context attached are untouched passthroughs — no event, no
/// body buffering.
pub struct CredentialTrackingMiddleware {
    tracker: Arc<Tracker>,
    parsers: ParserRegistry,
    user_id_extractor: Option<UserIdExtractor>,
}

impl CredentialTrackingMiddleware {
    #[must_use]
    pub fn new(tracker: Arc<Tracker>, parsers: ParserRegistry) -> Self {
        Self { tracker, parsers, user_id_extractor: None }
    }

    /// Install a fallback user-id extractor, consulted when the
    /// credential context carries no explicit user.
    #[must_use]
    pub fn with_user_id_extractor(mut self, extractor: UserIdExtractor) -> Self {
        self.user_id_extractor = Some(extractor);
        self
    }

    async fn submit(&self, event: Event) {
        if let Err(err) = self.tracker.track_usage(event).await {
            warn!(error = %err, "credential usage event dropped");
        }
    }
}

#[async_trait]
impl Middleware for CredentialTrackingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> MiddlewareResult<Response> {
        let Some(context) = get_credential_context(extensions).cloned() else {
            debug!("outbound request has no credential context, passing through uninstrumented");
            return next.run(req, extensions).await;
        };

        let user_id = context_user_id(extensions, self.user_id_extractor.as_deref());

        let host = req.url().host_str().unwrap_or_default().to_string();
        let path = req.url().path().to_string();
        let service = detect_service(&RequestDescriptor { host: &host, path: &path }, &context.service);
        let method = req.method().to_string();

        let request_size = req.body().and_then(reqwest::Body::as_bytes).map_or(0, |b| b.len() as u64);

        let start = Instant::now();
        let outcome = next.run(req, extensions).await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(response) => {
                let status = response.status();
                let (response_size, tokens_used, response) =
                    tee_response(response, &service, &self.parsers).await;

                let (error_type, error_message) = if status.as_u16() >= 400 {
                    (
                        Some(ErrorType::HttpError),
                        Some(status.canonical_reason().unwrap_or("unknown status").to_string()),
                    )
                } else {
                    (None, None)
                };

                self.submit(Event {
                    credential_type: context.credential_type,
                    credential_id: context.credential_id.clone(),
                    user_id,
                    service,
                    endpoint: path,
                    method,
                    status_code: status.as_u16(),
                    response_time_ms,
                    tokens_used,
                    request_size,
                    response_size,
                    error_type,
                    error_message,
                    timestamp: Utc::now(),
                    metadata: None,
                })
                .await;

                Ok(response)
            }
            Err(err) => {
                self.submit(Event {
                    credential_type: context.credential_type,
                    credential_id: context.credential_id.clone(),
                    user_id,
                    service,
                    endpoint: path,
                    method,
                    status_code: 0,
                    response_time_ms,
                    tokens_used: 0,
                    request_size,
                    response_size: 0,
                    error_type: Some(ErrorType::RequestError),
                    error_message: Some(err.to_string()),
                    timestamp: Utc::now(),
                    metadata: None,
                })
                .await;

                Err(err)
            }
        }
    }
}

fn context_user_id(extensions: &Extensions, extractor: Option<&(dyn Fn(&Extensions) -> Option<String> + Send + Sync)>) -> String {
    extractor.and_then(|extract| extract(extensions)).unwrap_or_default()
}

/// Buffer the response body fully into memory, run the service's token
/// parser over the buffered bytes, and hand back a response carrying the
/// same byte sequence so the caller's read is observationally identical
/// to reading the original response. The parser never sees or mutates
/// the stream the caller reads.
async fn tee_response(response: Response, service: &str, parsers: &ParserRegistry) -> (u64, u64, Response) {
    let status = response.status();
    let mut builder = http::Response::builder().status(status);
    for (name, value) in response.headers() {
        builder = builder.header(name, value);
    }

    let bytes = match response.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer response body for token parsing");
            let rebuilt = builder
                .body(reqwest::Body::from(Vec::new()))
                .expect("status/headers captured from a real response cannot fail to rebuild");
            return (0, 0, Response::from(rebuilt));
        }
    };

    let tokens_used = match parsers.parse_tokens_used(service, &bytes) {
        Ok(tokens) => tokens,
        Err(err) => {
            debug!(service, error = %err, "token usage parse failed, recording zero");
            0
        }
    };

    let response_size = bytes.len() as u64;
    let rebuilt = builder
        .body(reqwest::Body::from(bytes))
        .expect("status/headers captured from a real response cannot fail to rebuild");
    (response_size, tokens_used, Response::from(rebuilt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_credential::{CredentialContext, CredentialType, InMemoryStore};
    use meridian_telemetry::TrackerConfig;

    #[tokio::test]
    async fn passthrough_without_context_emits_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let tracker = Arc::new(Tracker::spawn(TrackerConfig::default(), store.clone()));
        let middleware =
            CredentialTrackingMiddleware::new(tracker.clone(), ParserRegistry::with_defaults());

        let extensions = Extensions::new();
        assert!(get_credential_context(&extensions).is_none());

        tracker.shutdown(std::time::Duration::from_secs(1)).await.unwrap();
        assert_eq!(store.all_events().len(), 0);
        let _ = middleware;
    }

    #[test]
    fn credential_context_is_attached_via_extensions() {
        let mut extensions = Extensions::new();
        let ctx = CredentialContext::new(CredentialType::ApiKey, "ak_42", "openai").unwrap();
        ctx.attach(&mut extensions);
        assert!(get_credential_context(&extensions).is_some());
    }
}
