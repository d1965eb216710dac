//! Social platform client and posting policy for everyframe.
//!
//! The [`PlatformClient`] speaks the platform's HTTP API (upload media,
//! create post) and classifies failures into the categories the progression
//! engine cares about: rate limiting, transient faults, permanent content
//! rejections, and everything else. The [`Poster`] wraps the client with the
//! per-frame policy: caption composition, the rate-limit pause, bounded
//! exponential backoff, and the text-only fallback when media is rejected.

mod client;
mod error;
mod poster;
mod retry;

pub use client::PlatformClient;
pub use error::{PlatformError, PosterError};
pub use poster::{FramePoster, PostOutcome, Poster};
pub use retry::RetryPolicy;
