//! Endpoint URL helpers.

use crate::core::constants::DEFAULT_OPENAI_BASE_URL;

/// Strip trailing slashes so endpoints can be appended without doubling them.
///
/// ```
/// use color_compass::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("https://api.example.com/v1///"), "https://api.example.com/v1");
/// ```
pub fn normalize_base_url(base_url: &str) -> &str {
    base_url.trim().trim_end_matches('/')
}

/// Join a base URL and an endpoint path with exactly one slash.
///
/// ```
/// use color_compass::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("https://api.example.com/v1/", "/chat/completions"),
///     "https://api.example.com/v1/chat/completions"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        normalize_base_url(base_url),
        endpoint.trim_start_matches('/')
    )
}

pub fn completions_url(base_url: &str) -> String {
    construct_api_url(base_url, "chat/completions")
}

/// True when `base_url` points at OpenAI itself rather than a compatible
/// third-party endpoint.
pub fn is_default_openai(base_url: &str) -> bool {
    normalize_base_url(base_url).eq_ignore_ascii_case(DEFAULT_OPENAI_BASE_URL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://api.example.com/v1/"),
            "https://api.example.com/v1"
        );
        assert_eq!(
            normalize_base_url(" https://api.example.com "),
            "https://api.example.com"
        );
        assert_eq!(normalize_base_url("///"), "");
    }

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:11434/v1///"),
            "http://localhost:11434/v1/chat/completions"
        );
    }

    #[test]
    fn test_is_default_openai() {
        assert!(is_default_openai("https://api.openai.com/v1/"));
        assert!(!is_default_openai("http://localhost:11434/v1"));
    }
}
