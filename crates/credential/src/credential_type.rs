use std::fmt;

use serde::{Deserialize, Serialize};

/// The four kinds of stored credential the platform tracks usage for.
///
/// Matches the four collections named in the external interface: `tokens`,
/// `dev_tokens`, `api_keys`, `security_keys`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// OAuth access/refresh token pair.
    Token,
    /// Platform-issued developer token, used for inbound authentication.
    DevToken,
    /// Third-party API key.
    ApiKey,
    /// SSH key pair.
    SecurityKey,
}

impl CredentialType {
    /// Name of the PocketBase-style collection this credential type's
    /// records live in.
    #[must_use]
    pub fn collection_name(self) -> &'static str {
        match self {
            Self::Token => "tokens",
            Self::DevToken => "dev_tokens",
            Self::ApiKey => "api_keys",
            Self::SecurityKey => "security_keys",
        }
    }

    /// Parse a collection or wire name back into a `CredentialType`.
    /// Returns `None` for anything outside the closed set — callers use
    /// this to reject unknown credential types rather than guessing.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "token" | "tokens" => Some(Self::Token),
            "dev_token" | "dev_tokens" => Some(Self::DevToken),
            "api_key" | "api_keys" => Some(Self::ApiKey),
            "security_key" | "security_keys" => Some(Self::SecurityKey),
            _ => None,
        }
    }

    /// Wire tag used on `Event::credential_type` and in the `"{type}:{id}"`
    /// keys of `aggregate_all_user_stats`.
    #[must_use]
    pub fn wire_tag(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::DevToken => "dev_token",
            Self::ApiKey => "api_key",
            Self::SecurityKey => "security_key",
        }
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_wire_tag() {
        for ty in [
            CredentialType::Token,
            CredentialType::DevToken,
            CredentialType::ApiKey,
            CredentialType::SecurityKey,
        ] {
            assert_eq!(CredentialType::parse(ty.wire_tag()), Some(ty));
        }
    }

    #[test]
    fn rejects_unknown_type() {
        assert_eq!(CredentialType::parse("bearer"), None);
    }
}
