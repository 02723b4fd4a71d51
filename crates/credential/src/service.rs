//! Service detection: maps an outbound request's host/path to a
//! normalized service tag. Matching is exact-host-or-suffix,
//! case-insensitive, and checked in a fixed order so more-specific hosts
//! win over generic ones (e.g. a `google_calendar`-specific path check
//! runs before the generic `google` suffix match).

/// Minimal description of an outbound request, independent of whatever
/// HTTP client crate constructed it. `meridian-http` builds this from a
/// real `reqwest::Request`; tests construct it directly.
#[derive(Debug, Clone)]
pub struct RequestDescriptor<'a> {
    pub host: &'a str,
    pub path: &'a str,
}

/// One entry in the fixed-order host match table.
struct ServiceRule {
    /// Suffix the host must end with (case-insensitively). An exact host
    /// match is just a suffix match against the whole string.
    host_suffix: &'static str,
    /// If set, the path must also contain this substring for the rule to
    /// match — used to carve `google_calendar` out of the generic
    /// `google` suffix.
    path_contains: Option<&'static str>,
    tag: &'static str,
}

/// Fixed order: entries are checked top to bottom, first match wins. More
/// specific rules (narrower host suffix, or a path constraint) are listed
/// before the broader ones they'd otherwise be shadowed by.
const RULES: &[ServiceRule] = &[
    ServiceRule { host_suffix: "api.openai.com", path_contains: None, tag: "openai" },
    ServiceRule { host_suffix: "api.anthropic.com", path_contains: None, tag: "claude" },
    ServiceRule { host_suffix: "googleapis.com", path_contains: Some("/calendar"), tag: "google_calendar" },
    ServiceRule { host_suffix: "googleapis.com", path_contains: None, tag: "google" },
    ServiceRule { host_suffix: "github.com", path_contains: None, tag: "github" },
    ServiceRule { host_suffix: "gitlab.com", path_contains: None, tag: "gitlab" },
    ServiceRule { host_suffix: "coolify.io", path_contains: None, tag: "coolify" },
    ServiceRule { host_suffix: "pocketbase.io", path_contains: None, tag: "pocketbase" },
];

fn host_matches(host: &str, suffix: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let suffix = suffix.to_ascii_lowercase();
    host == suffix || host.ends_with(&format!(".{suffix}"))
}

/// Detect the normalized service tag for an outbound request. If no rule
/// matches and `context_service_hint` is non-empty, the hint is used
/// instead (the credential context's `service` field). Falls back to
/// `"unknown"` only when neither matches.
#[must_use]
pub fn detect_service(request: &RequestDescriptor<'_>, context_service_hint: &str) -> String {
    for rule in RULES {
        if host_matches(request.host, rule.host_suffix) {
            if let Some(needle) = rule.path_contains {
                if !request.path.contains(needle) {
                    continue;
                }
            }
            return rule.tag.to_string();
        }
    }
    if !context_service_hint.is_empty() {
        return context_service_hint.to_string();
    }
    "unknown".to_string()
}
