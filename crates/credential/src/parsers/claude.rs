use serde::Deserialize;

use super::ParseError;

#[derive(Deserialize)]
struct MessagesResponse {
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Extract token usage from an Anthropic Messages API response, where
/// input and output tokens are reported separately and summed into the
/// single `tokens_used` field the event model carries.
pub fn parse_tokens_used(body: &[u8]) -> Result<u64, ParseError> {
    let parsed: MessagesResponse =
        serde_json::from_slice(body).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
    let usage = parsed.usage.ok_or(ParseError::MissingUsage)?;
    Ok(usage.input_tokens + usage.output_tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_input_and_output_tokens() {
        let body = br#"{"id":"msg_1","usage":{"input_tokens":50,"output_tokens":87}}"#;
        assert_eq!(parse_tokens_used(body).unwrap(), 137);
    }
}
