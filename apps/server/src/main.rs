//! Demo binary wiring the credential usage telemetry pipeline into a
//! small `axum` application: one inbound route instrumented by the
//! Ingress Middleware, and one outbound call instrumented by the Egress
//! Transport Wrapper, both feeding the same [`Tracker`].

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use meridian_credential::{CredentialType, InMemoryStore, ParserRegistry};
use meridian_http::{track_dev_token_usage, CredentialTrackingMiddleware, DevTokenIdentity, DevTokenValidator, IngressState};
use meridian_telemetry::{Tracker, TrackerConfig};
use reqwest_middleware::ClientBuilder;
use tracing::info;

/// Stand-in developer-token validator. A real deployment backs this with
/// the credential store's `dev_tokens` collection; here any non-empty
/// token that starts with `dtk_` resolves to a fixed identity, just
/// enough to exercise the ingress middleware end to end.
struct DemoValidator;

#[async_trait]
impl DevTokenValidator for DemoValidator {
    async fn validate(&self, token: &str) -> Option<DevTokenIdentity> {
        token
            .strip_prefix("dtk_")
            .map(|id| DevTokenIdentity { user_id: "demo-user".to_string(), credential_id: format!("dt_{id}") })
    }
}

struct AppState {
    egress_client: reqwest_middleware::ClientWithMiddleware,
}

async fn health() -> &'static str {
    "ok"
}

/// Issues one instrumented outbound call per request, demonstrating the
/// Egress Transport Wrapper. The credential context is attached on the
/// extensions passed alongside the request so the middleware can attribute
/// the call; callers with nothing to attribute to simply omit it.
async fn proxy_openai_usage(State(state): State<Arc<AppState>>) -> &'static str {
    let mut extensions = http::Extensions::new();
    meridian_credential::CredentialContext::new(CredentialType::ApiKey, "ak_demo", "openai")
        .expect("credential id is non-empty")
        .attach(&mut extensions);

    let request = state
        .egress_client
        .get("https://api.openai.com/v1/models")
        .build()
        .expect("well-formed request");

    // Fire-and-forget from the route handler's perspective: failures here
    // are still recorded as a transport-error event by the middleware.
    let _ = state.egress_client.execute_with_extensions(request, &mut extensions).await;

    "dispatched"
}

#[tokio::main]
async fn main() {
    meridian_log::init_default();

    let store = Arc::new(InMemoryStore::new());
    let tracker = Arc::new(Tracker::spawn(TrackerConfig::from_env(), store.clone()));

    let egress_middleware =
        CredentialTrackingMiddleware::new(tracker.clone(), ParserRegistry::with_defaults());
    let egress_client =
        ClientBuilder::new(reqwest::Client::new()).with_arc(Arc::new(egress_middleware)).build();

    let app_state = Arc::new(AppState { egress_client });

    let ingress_state = Arc::new(IngressState {
        validator: Arc::new(DemoValidator),
        tracker: tracker.clone(),
        service_tag: "pocketbase".to_string(),
    });

    let app = Router::new()
        .route("/api/usage-demo", get(proxy_openai_usage))
        .route_layer(middleware::from_fn_with_state(ingress_state, track_dev_token_usage))
        .route("/health", get(health))
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    info!(%addr, "meridian-server listening");

    let listener = tokio::net::TcpListener::bind(addr).await.expect("failed to bind listener");
    let shutdown_tracker = tracker.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received, draining tracker");
            if let Err(err) = shutdown_tracker.shutdown(Duration::from_secs(10)).await {
                tracing::error!(error = %err, "tracker shutdown deadline exceeded");
            }
        })
        .await
        .expect("server error");
}
