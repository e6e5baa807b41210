//! Credential validation and request authentication.

use std::fmt;

use crate::core::error::ChatError;
use crate::utils::url::is_default_openai;

const OPENAI_KEY_MARKER: &str = "sk-";

/// A validated API key. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Checks the key locally before any network activity.
    ///
    /// OpenAI keys must contain `sk-`; compatible endpoints only need a
    /// non-empty key without whitespace.
    pub fn parse(raw: &str, base_url: &str) -> Result<Self, ChatError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(ChatError::InvalidCredential(
                "no API key provided (set OPENAI_API_KEY)".to_string(),
            ));
        }
        if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ChatError::InvalidCredential(
                "API key contains whitespace or control characters".to_string(),
            ));
        }
        if is_default_openai(base_url) && !key.contains(OPENAI_KEY_MARKER) {
            return Err(ChatError::InvalidCredential(format!(
                "OpenAI API keys contain '{OPENAI_KEY_MARKER}'"
            )));
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// Attach bearer authentication to an outbound request.
pub fn add_auth_headers(request: reqwest::RequestBuilder, api_key: &ApiKey) -> reqwest::RequestBuilder {
    request.header("Authorization", format!("Bearer {}", api_key.expose()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPENAI: &str = "https://api.openai.com/v1";
    const LOCAL: &str = "http://localhost:8080/v1";

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            ApiKey::parse("", OPENAI),
            Err(ChatError::InvalidCredential(_))
        ));
        assert!(matches!(
            ApiKey::parse("   ", LOCAL),
            Err(ChatError::InvalidCredential(_))
        ));
    }

    #[test]
    fn openai_keys_need_marker() {
        assert!(ApiKey::parse("sk-test-123", OPENAI).is_ok());
        assert!(ApiKey::parse("sk-proj-abc", "https://api.openai.com/v1/").is_ok());
        assert!(matches!(
            ApiKey::parse("abc123", OPENAI),
            Err(ChatError::InvalidCredential(_))
        ));
        assert!(ApiKey::parse("abc123", LOCAL).is_ok());
    }

    #[test]
    fn keys_are_trimmed_but_inner_whitespace_rejected() {
        let key = ApiKey::parse("  sk-abc\n", OPENAI).unwrap();
        assert_eq!(key.expose(), "sk-abc");
        assert!(ApiKey::parse("sk-a bc", OPENAI).is_err());
    }

    #[test]
    fn debug_redacts_secret() {
        let key = ApiKey::parse("sk-secret", OPENAI).unwrap();
        assert!(!format!("{key:?}").contains("secret"));
    }

    #[test]
    fn bearer_header_is_added() {
        let key = ApiKey::parse("sk-test", OPENAI).unwrap();
        let client = reqwest::Client::new();
        let request = add_auth_headers(client.post("http://localhost/"), &key)
            .build()
            .unwrap();
        assert_eq!(
            request.headers().get("Authorization").unwrap(),
            "Bearer sk-test"
        );
    }
}
