//! Social platform HTTP client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::PlatformError;

/// Client for the social platform's posting API.
pub struct PlatformClient {
    http: Client,
    base_url: String,
    access_token: String,
}

impl PlatformClient {
    /// Create a new client for the given API base URL.
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            base_url: base_url.into(),
            access_token: access_token.into(),
        }
    }

    /// Upload media bytes; returns the platform's media id for use in a
    /// post.
    pub async fn upload_media(
        &self,
        data: &[u8],
        mime_type: &str,
    ) -> Result<String, PlatformError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct UploadMediaResponse {
            media_id: String,
        }

        let url = format!("{}/api/v1/media", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .header("Content-Type", mime_type)
            .body(data.to_vec())
            .send()
            .await?;

        let body: UploadMediaResponse = handle_response(response).await?;
        debug!(size = data.len(), mime_type, media_id = %body.media_id, "uploaded media");
        Ok(body.media_id)
    }

    /// Create a post, optionally referencing uploaded media.
    ///
    /// Returns the platform's post id. Failures arrive pre-classified as
    /// [`PlatformError`] variants.
    pub async fn create_post(
        &self,
        text: &str,
        media_id: Option<&str>,
    ) -> Result<String, PlatformError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct CreatePostRequest<'a> {
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            media_ids: Option<Vec<&'a str>>,
        }

        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct CreatePostResponse {
            post_id: String,
        }

        let url = format!("{}/api/v1/posts", self.base_url);

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(&CreatePostRequest {
                text,
                media_ids: media_id.map(|id| vec![id]),
            })
            .send()
            .await?;

        let body: CreatePostResponse = handle_response(response).await?;
        debug!(post_id = %body.post_id, chars = text.chars().count(), "created post");
        Ok(body.post_id)
    }
}

/// API error response format.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
    message: String,
}

/// Triage an HTTP response into a parsed body or a classified error.
async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, PlatformError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        return Err(PlatformError::RateLimited { retry_after_secs });
    }

    if !status.is_success() {
        let text = response.text().await.map_err(|e| {
            PlatformError::InvalidResponse(format!(
                "request failed ({}): failed to read response: {}",
                status, e
            ))
        })?;

        if let Ok(api_error) = serde_json::from_str::<ApiError>(&text) {
            return Err(classify_api_error(api_error));
        }

        if status.is_server_error() {
            return Err(PlatformError::Server {
                status: status.as_u16(),
            });
        }

        return Err(PlatformError::InvalidResponse(format!(
            "request failed ({}): {}",
            status, text
        )));
    }

    let body = response.json().await?;
    Ok(body)
}

/// Map the platform's error codes onto the posting policy's categories.
fn classify_api_error(api_error: ApiError) -> PlatformError {
    match api_error.error.as_str() {
        "DuplicateContent" => PlatformError::Duplicate,
        "PostTooLong" => PlatformError::OverLength,
        "MediaRejected" | "UnsupportedMediaType" | "InvalidMedia" => {
            PlatformError::MediaRejected(api_error.message)
        }
        _ => PlatformError::Api {
            error: api_error.error,
            message: api_error.message,
        },
    }
}
