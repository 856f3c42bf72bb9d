//! Error types for the finguru relay and chat client.

/// Top-level error type for the chat relay system.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Upstream generative-language API failure.
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Relay server error (bind, serve).
    #[error("server error: {0}")]
    Server(String),

    /// Client-side transport error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Durable key-value storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Speech synthesis error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send/receive error.
    #[error("channel error: {0}")]
    Channel(String),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, ChatError>;

/// Upstream API failure, classified by signature.
///
/// The classification drives the user-facing message surfaced as the
/// terminal error chunk of a relay stream; the relay never raises these
/// past its boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    /// Missing, malformed, or rejected API credentials.
    #[error("invalid API credentials: {0}")]
    InvalidCredentials(String),

    /// Connection-level failure before or during the upstream call.
    #[error("network error: {0}")]
    Network(String),

    /// HTTP 429 from the upstream service.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// HTTP 5xx from the upstream service.
    #[error("upstream server fault: {0}")]
    ServerFault(String),

    /// Anything that fits none of the other categories.
    #[error("upstream error: {0}")]
    Other(String),
}

impl UpstreamError {
    /// The message shown to the end user in place of a model reply.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::InvalidCredentials(_) => {
                "There seems to be an issue with the API configuration. Please contact support."
            }
            Self::Network(_) => {
                "I'm having trouble connecting to the network. Please check your internet connection."
            }
            Self::RateLimited(_) => {
                "I'm experiencing high traffic right now. Please try again in a moment."
            }
            Self::ServerFault(_) => {
                "The AI service is temporarily unavailable. I'm working on getting it back online."
            }
            Self::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn user_messages_cover_taxonomy() {
        let cases = [
            UpstreamError::InvalidCredentials("bad key".into()),
            UpstreamError::Network("refused".into()),
            UpstreamError::RateLimited("429".into()),
            UpstreamError::ServerFault("503".into()),
            UpstreamError::Other("???".into()),
        ];
        let messages: Vec<&str> = cases.iter().map(UpstreamError::user_message).collect();
        assert!(messages[0].contains("configuration"));
        assert!(messages[1].contains("network"));
        assert!(messages[2].contains("high traffic"));
        assert!(messages[3].contains("temporarily unavailable"));
        assert!(messages[4].contains("unexpected error"));
    }

    #[test]
    fn upstream_converts_into_chat_error() {
        let err: ChatError = UpstreamError::RateLimited("slow down".into()).into();
        assert!(matches!(err, ChatError::Upstream(_)));
    }
}
