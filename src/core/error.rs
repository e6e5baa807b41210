//! Failures surfaced to the user-facing layer. None of them are retried.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// The API key is missing or malformed; no request was sent.
    InvalidCredential(String),
    /// The remote call failed before any fragment arrived; the transcript
    /// is unchanged.
    RemoteCallFailed(String),
    /// The stream broke off after `received` fragments. The partial reply
    /// was still committed, flagged as truncated.
    StreamInterrupted { reason: String, received: usize },
    /// An uploaded image was rejected and not added to the transcript.
    UnsupportedImageFormat(String),
    /// The caller abandoned the stream; nothing was committed.
    Cancelled,
}

impl ChatError {
    /// Whether the transcript gained a (partial) assistant message despite
    /// the error.
    pub fn kept_partial_reply(&self) -> bool {
        matches!(self, ChatError::StreamInterrupted { .. })
    }
}

impl fmt::Display for ChatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatError::InvalidCredential(reason) => {
                write!(f, "Invalid API key: {reason}")
            }
            ChatError::RemoteCallFailed(reason) => {
                write!(f, "Request failed: {reason}")
            }
            ChatError::StreamInterrupted { reason, received } => {
                write!(
                    f,
                    "Reply interrupted after {received} fragment(s) and may be incomplete: {reason}"
                )
            }
            ChatError::UnsupportedImageFormat(reason) => {
                write!(f, "Unsupported image: {reason}")
            }
            ChatError::Cancelled => write!(f, "Request cancelled"),
        }
    }
}

impl std::error::Error for ChatError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_human_readable() {
        let err = ChatError::StreamInterrupted {
            reason: "connection reset".into(),
            received: 2,
        };
        assert_eq!(
            err.to_string(),
            "Reply interrupted after 2 fragment(s) and may be incomplete: connection reset"
        );
        assert!(err.kept_partial_reply());
        assert!(!ChatError::RemoteCallFailed("boom".into()).kept_partial_reply());
    }
}
