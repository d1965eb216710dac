//! Error types for the platform client and poster.

use thiserror::Error;

/// Classified errors from the social platform API.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// HTTP request failed (connection, timeout, protocol).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform signaled rate limiting.
    #[error("rate limited{}", retry_after_secs.map(|s| format!(" (retry after {}s)", s)).unwrap_or_default())]
    RateLimited {
        /// Seconds to wait, from the Retry-After header when present.
        retry_after_secs: Option<u64>,
    },

    /// The platform rejected the post as duplicate content.
    #[error("duplicate content rejected")]
    Duplicate,

    /// The caption exceeds the platform's length limit.
    #[error("caption exceeds platform length limit")]
    OverLength,

    /// The media attachment was rejected.
    #[error("media rejected: {0}")]
    MediaRejected(String),

    /// Server-side failure without a structured error body.
    #[error("server error: HTTP {status}")]
    Server { status: u16 },

    /// Structured API error from the platform.
    #[error("API error: {error} - {message}")]
    Api { error: String, message: String },

    /// Response could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl PlatformError {
    /// Whether this error is transient and worth retrying the same frame.
    pub fn is_transient(&self) -> bool {
        match self {
            PlatformError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            PlatformError::Server { .. } => true,
            PlatformError::Api { error, .. } => matches!(
                error.as_str(),
                "ServiceUnavailable" | "InternalServerError" | "UpstreamFailure" | "UpstreamTimeout"
            ),
            _ => false,
        }
    }
}

/// Errors surfaced by [`Poster::post_frame`](crate::Poster::post_frame)
/// after the per-frame policy is exhausted.
#[derive(Debug, Error)]
pub enum PosterError {
    /// The frame file could not be read.
    #[error("failed to read frame file: {0}")]
    Io(#[from] std::io::Error),

    /// The bounded retry budget for transient faults ran out.
    #[error("retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: PlatformError,
    },

    /// Unexpected platform failure; triggers the engine's generic error
    /// path (notify, pause, resume).
    #[error(transparent)]
    Platform(#[from] PlatformError),
}
