use http::Extensions;

use crate::credential_type::CredentialType;

/// Per-request carrier propagating `(credential_type, credential_id,
/// service)` from the point of credential lookup down to the HTTP
/// transport.
///
/// This rides on [`http::Extensions`] rather than a bespoke global or
/// task-local, because `Extensions` is already threaded through both
/// `axum::http::Request`/`Response` and `reqwest::Request` — the "carrier
/// the surrounding framework already threads through" called for by the
/// design notes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialContext {
    pub credential_type: CredentialType,
    pub credential_id: String,
    /// Service hint; used by the detector only when host/path matching
    /// comes up empty. May be empty — only `credential_id` is required
    /// to be non-empty for the context to be considered present.
    pub service: String,
}

impl CredentialContext {
    /// Returns `None` if `credential_id` is empty — an empty id can never
    /// identify a real credential, so such a context is treated the same
    /// as no context at all.
    #[must_use]
    pub fn new(
        credential_type: CredentialType,
        credential_id: impl Into<String>,
        service: impl Into<String>,
    ) -> Option<Self> {
        let credential_id = credential_id.into();
        if credential_id.is_empty() {
            return None;
        }
        Some(Self {
            credential_type,
            credential_id,
            service: service.into(),
        })
    }

    /// Attach this context to a request/response's extensions, replacing
    /// any context already present.
    pub fn attach(self, extensions: &mut Extensions) {
        extensions.insert(self);
    }
}

/// Derive a new extensions map carrying `ctx` on top of whatever `base`
/// already held — mirrors `withCredentialContext(ctx, type, id, service)`
/// from the original design, adapted to `Extensions`' value semantics.
#[must_use]
pub fn with_credential_context(mut base: Extensions, ctx: CredentialContext) -> Extensions {
    ctx.attach(&mut base);
    base
}

/// Read the credential context back out, if one was attached and its
/// `credential_id` is non-empty (guaranteed by the constructor, but
/// re-checked here in case a context was inserted via some other path).
#[must_use]
pub fn get_credential_context(extensions: &Extensions) -> Option<&CredentialContext> {
    extensions
        .get::<CredentialContext>()
        .filter(|ctx| !ctx.credential_id.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_credential_id_is_rejected() {
        assert!(CredentialContext::new(CredentialType::ApiKey, "", "openai").is_none());
    }

    #[test]
    fn round_trips_through_extensions() {
        let mut extensions = Extensions::new();
        let ctx = CredentialContext::new(CredentialType::ApiKey, "ak_42", "openai").unwrap();
        ctx.attach(&mut extensions);

        let read_back = get_credential_context(&extensions).unwrap();
        assert_eq!(read_back.credential_id, "ak_42");
        assert_eq!(read_back.service, "openai");
    }

    #[test]
    fn absent_context_is_none() {
        let extensions = Extensions::new();
        assert!(get_credential_context(&extensions).is_none());
    }
}
