//! Best-effort email alerts.
//!
//! Alerts go out over an HTTP mail provider API. Delivery is fire-and-forget
//! from the progression engine's point of view: sends are retried with a
//! small bounded backoff, and a final failure is logged, never fatal.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

/// Maximum send attempts before giving up on an alert.
const MAX_SEND_ATTEMPTS: u32 = 3;

/// Base backoff between send attempts (doubles each retry).
const SEND_BACKOFF: Duration = Duration::from_millis(500);

/// Seam for the progression engine: anything that can deliver an alert.
///
/// Returns whether the alert was delivered. Implementations must not fail
/// the caller; delivery problems are their own concern.
#[async_trait]
pub trait Notify: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> bool;
}

#[async_trait]
impl<T: Notify + ?Sized> Notify for Box<T> {
    async fn send(&self, subject: &str, body: &str) -> bool {
        (**self).send(subject, body).await
    }
}

/// Email notifier backed by an HTTP mail provider.
pub struct EmailNotifier {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    from: String,
    to: String,
    backoff: Duration,
}

impl EmailNotifier {
    pub fn new(
        api_url: impl Into<String>,
        api_key: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
            from: from.into(),
            to: to.into(),
            backoff: SEND_BACKOFF,
        }
    }

    /// Shrink the retry backoff (tests).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    async fn try_send(&self, subject: &str, body: &str) -> Result<(), reqwest::Error> {
        let url = format!("{}/messages", self.api_url);
        self.http
            .post(&url)
            .basic_auth("api", Some(&self.api_key))
            .form(&[
                ("from", self.from.as_str()),
                ("to", self.to.as_str()),
                ("subject", subject),
                ("text", body),
            ])
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notify for EmailNotifier {
    async fn send(&self, subject: &str, body: &str) -> bool {
        for attempt in 0..MAX_SEND_ATTEMPTS {
            match self.try_send(subject, body).await {
                Ok(()) => {
                    info!(subject, "sent alert email");
                    return true;
                }
                Err(e) if attempt + 1 < MAX_SEND_ATTEMPTS => {
                    let backoff = self.backoff * 2u32.saturating_pow(attempt);
                    warn!(
                        subject,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "alert email failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    warn!(subject, error = %e, "alert email failed, giving up");
                }
            }
        }
        false
    }
}

/// Notifier used when email alerts are disabled; reports success without
/// sending anything.
pub struct NoopNotifier;

#[async_trait]
impl Notify for NoopNotifier {
    async fn send(&self, subject: &str, _body: &str) -> bool {
        info!(subject, "email alerts disabled, dropping alert");
        true
    }
}
