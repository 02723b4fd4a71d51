//! End-to-end coverage of the Ingress Middleware against a real `axum`
//! server, exercising the developer-token usage scenario.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::Router;
use meridian_credential::InMemoryStore;
use meridian_http::ingress::{track_dev_token_usage, DevTokenIdentity, DevTokenValidator, IngressState, AUTH_SYNC_TOKEN_HEADER};
use meridian_telemetry::{Tracker, TrackerConfig};

struct FixedValidator;

#[async_trait]
impl DevTokenValidator for FixedValidator {
    async fn validate(&self, token: &str) -> Option<DevTokenIdentity> {
        (token == "dtk_good")
            .then(|| DevTokenIdentity { user_id: "user_1".into(), credential_id: "dt_1".into() })
    }
}

async fn spawn_server(state: Arc<IngressState>) -> String {
    let app = Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route_layer(from_fn_with_state(state, track_dev_token_usage));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn valid_dev_token_is_admitted_and_recorded() {
    let store = Arc::new(InMemoryStore::new());
    let tracker = Arc::new(Tracker::spawn(TrackerConfig::default(), store.clone()));
    let state = Arc::new(IngressState {
        validator: Arc::new(FixedValidator),
        tracker: tracker.clone(),
        service_tag: "pocketbase".into(),
    });
    let base_url = spawn_server(state).await;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("{base_url}/ping"))
        .header(AUTH_SYNC_TOKEN_HEADER.as_str(), "dtk_good")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "pong");

    tracker.shutdown(Duration::from_secs(2)).await.unwrap();

    let events = store.all_events();
    assert_eq!(events.len(), 1);
    let event = &events[0].event;
    assert_eq!(event.credential_id, "dt_1");
    assert_eq!(event.user_id, "user_1");
    assert_eq!(event.service, "pocketbase");
    assert_eq!(event.status_code, 200);
}

#[tokio::test]
async fn missing_token_is_rejected_without_producing_an_event() {
    let store = Arc::new(InMemoryStore::new());
    let tracker = Arc::new(Tracker::spawn(TrackerConfig::default(), store.clone()));
    let state = Arc::new(IngressState {
        validator: Arc::new(FixedValidator),
        tracker: tracker.clone(),
        service_tag: "pocketbase".into(),
    });
    let base_url = spawn_server(state).await;

    let client = reqwest::Client::new();
    let response = client.get(format!("{base_url}/ping")).send().await.unwrap();
    assert_eq!(response.status(), 401);

    let bad_token_response = client
        .get(format!("{base_url}/ping"))
        .header(AUTH_SYNC_TOKEN_HEADER.as_str(), "dtk_wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(bad_token_response.status(), 401);

    tracker.shutdown(Duration::from_secs(2)).await.unwrap();
    assert_eq!(store.all_events().len(), 0);
}
