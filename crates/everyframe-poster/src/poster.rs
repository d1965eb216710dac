//! Per-frame posting policy.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::{PlatformClient, PlatformError, PosterError, RetryPolicy};

/// Default pause when the platform signals rate limiting.
const DEFAULT_RATE_LIMIT_PAUSE: Duration = Duration::from_secs(15 * 60);

/// How a frame was resolved by the poster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOutcome {
    /// Posted with its image attached.
    Posted,
    /// Media was rejected; the caption went out as a text-only post.
    PostedTextOnly,
    /// Duplicate-content rejection; the frame is skipped, not posted.
    SkippedDuplicate,
    /// Caption over the platform's length limit; skipped, not posted.
    SkippedOverLength,
}

impl PostOutcome {
    /// Whether anything actually reached the platform.
    pub fn was_posted(&self) -> bool {
        matches!(self, PostOutcome::Posted | PostOutcome::PostedTextOnly)
    }
}

/// Seam for the progression engine: anything that can post one frame.
#[async_trait]
pub trait FramePoster: Send + Sync {
    async fn post_frame(
        &self,
        path: &Path,
        movie_tag: &str,
        frame: u32,
        total: usize,
    ) -> Result<PostOutcome, PosterError>;
}

/// Uploads a frame's image, composes the caption, and submits the post,
/// applying the failure policy per category.
pub struct Poster {
    client: PlatformClient,
    hashtags: String,
    retry: RetryPolicy,
    rate_limit_pause: Duration,
}

impl Poster {
    pub fn new(client: PlatformClient, hashtags: impl Into<String>) -> Self {
        Self {
            client,
            hashtags: hashtags.into(),
            retry: RetryPolicy::default(),
            rate_limit_pause: DEFAULT_RATE_LIMIT_PAUSE,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_rate_limit_pause(mut self, pause: Duration) -> Self {
        self.rate_limit_pause = pause;
        self
    }

    /// `"<movie-tag> - Frame <n> of <total>"` plus the fixed hashtag block.
    pub fn compose_caption(&self, movie_tag: &str, frame: u32, total: usize) -> String {
        let mut caption = format!("{} - Frame {} of {}", movie_tag, frame, total);
        if !self.hashtags.is_empty() {
            caption.push('\n');
            caption.push_str(&self.hashtags);
        }
        caption
    }

    /// One upload-then-post attempt.
    async fn try_post(
        &self,
        data: &[u8],
        mime_type: &str,
        caption: &str,
    ) -> Result<(), PlatformError> {
        let media_id = self.client.upload_media(data, mime_type).await?;
        self.client.create_post(caption, Some(&media_id)).await?;
        Ok(())
    }
}

#[async_trait]
impl FramePoster for Poster {
    async fn post_frame(
        &self,
        path: &Path,
        movie_tag: &str,
        frame: u32,
        total: usize,
    ) -> Result<PostOutcome, PosterError> {
        let data = tokio::fs::read(path).await?;
        let mime_type = mime_for_path(path);
        let caption = self.compose_caption(movie_tag, frame, total);

        let mut attempts = 0u32;
        loop {
            match self.try_post(&data, mime_type, &caption).await {
                Ok(()) => {
                    info!(frame, total, "posted frame");
                    return Ok(PostOutcome::Posted);
                }

                // Long fixed pause, then retry the same frame. Rate limiting
                // doesn't consume the transient-retry budget.
                Err(PlatformError::RateLimited { retry_after_secs }) => {
                    let pause = retry_after_secs
                        .map(Duration::from_secs)
                        .unwrap_or(self.rate_limit_pause);
                    warn!(
                        frame,
                        pause_secs = pause.as_secs(),
                        "rate limited, pausing before retrying same frame"
                    );
                    sleep(pause).await;
                }

                Err(PlatformError::Duplicate) => {
                    warn!(frame, "duplicate content rejected, skipping frame");
                    return Ok(PostOutcome::SkippedDuplicate);
                }

                // A caption over the limit is a construction defect, not a
                // transient fault; retrying the identical caption can't help.
                Err(PlatformError::OverLength) => {
                    warn!(
                        frame,
                        chars = caption.chars().count(),
                        "caption over platform length limit, skipping frame"
                    );
                    return Ok(PostOutcome::SkippedOverLength);
                }

                Err(PlatformError::MediaRejected(reason)) => {
                    warn!(frame, %reason, "media rejected, retrying once as text-only");
                    return match self.client.create_post(&caption, None).await {
                        Ok(_) => Ok(PostOutcome::PostedTextOnly),
                        Err(e) => Err(PosterError::Platform(e)),
                    };
                }

                Err(e) if e.is_transient() => {
                    attempts += 1;
                    if attempts >= self.retry.max_attempts {
                        return Err(PosterError::RetriesExhausted { attempts, last: e });
                    }
                    let delay = self.retry.delay_for(attempts - 1);
                    warn!(
                        frame,
                        attempt = attempts,
                        delay_secs = delay.as_secs(),
                        error = %e,
                        "transient platform error, backing off"
                    );
                    sleep(delay).await;
                }

                Err(e) => return Err(PosterError::Platform(e)),
            }
        }
    }
}

/// MIME type from the frame file's extension.
fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}
