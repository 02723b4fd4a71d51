//! The two instrumentation seams: the Egress Transport Wrapper around an
//! outbound `reqwest` client, and the Ingress Middleware around inbound
//! developer-token-authenticated `axum` handlers. Both ride credential
//! attribution on `http::Extensions` and submit to a shared
//! [`meridian_telemetry::Tracker`].

pub mod egress;
pub mod ingress;

pub use egress::{CredentialTrackingMiddleware, UserIdExtractor};
pub use ingress::{track_dev_token_usage, DevTokenIdentity, DevTokenValidator, IngressState, AUTH_SYNC_TOKEN_HEADER};
