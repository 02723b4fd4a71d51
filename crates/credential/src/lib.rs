//! Domain types for the credential usage telemetry pipeline: the `Event`
//! value type, the credential context carrier, service detection and
//! response parsers, and the store trait boundaries the Tracker and Stats
//! Aggregator write through.

mod context;
mod credential_type;
mod event;
mod parsers;
mod service;
mod store;
mod summary;

pub use context::{CredentialContext, get_credential_context, with_credential_context};
pub use credential_type::CredentialType;
pub use event::{ErrorType, Event, EventRecord, SSH_CONNECT};
pub use parsers::{ParseError, ParserRegistry, TokenParserFn};
pub use service::{RequestDescriptor, detect_service};
pub use store::{CredentialCollections, EventStore, InMemoryStore};
pub use summary::CredentialSummary;

pub use meridian_error::{AggregatorError, ShutdownError, StoreError, TrackerError};
