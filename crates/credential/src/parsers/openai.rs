use serde::Deserialize;

use super::ParseError;

#[derive(Deserialize)]
struct ChatCompletionResponse {
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u64,
}

/// Extract `usage.total_tokens` from an OpenAI chat-completions-shaped
/// response body.
pub fn parse_tokens_used(body: &[u8]) -> Result<u64, ParseError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_slice(body).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    parsed.usage.map(|u| u.total_tokens).ok_or(ParseError::MissingUsage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_total_tokens() {
        let body = br#"{"id":"x","usage":{"prompt_tokens":100,"completion_tokens":37,"total_tokens":137}}"#;
        assert_eq!(parse_tokens_used(body).unwrap(), 137);
    }

    #[test]
    fn missing_usage_is_an_error_not_zero() {
        let body = br#"{"id":"x"}"#;
        assert_eq!(parse_tokens_used(body), Err(ParseError::MissingUsage));
    }

    #[test]
    fn invalid_json_is_reported() {
        assert!(parse_tokens_used(b"not json").is_err());
    }
}
