//! X API write adapter for publishing posts

use async_trait::async_trait;
use crypto_scout_domain::{OutboundPost, PublishError, PublishResult, Publisher};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use time::OffsetDateTime;

/// Default X API root
pub const DEFAULT_BASE_URL: &str = "https://api.x.com";

/// X API publisher for creating standalone posts
pub struct XPublisher {
    client: Client,
    user_token: SecretString,
    base_url: String,
    max_chars: usize,
    enabled: bool,
}

impl XPublisher {
    pub fn new(user_token: SecretString, max_chars: usize) -> Result<Self, PublishError> {
        Self::with_base_url(user_token, DEFAULT_BASE_URL.to_string(), max_chars, true)
    }

    pub fn with_base_url(
        user_token: SecretString,
        base_url: String,
        max_chars: usize,
        enabled: bool,
    ) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PublishError::Api(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            user_token,
            base_url,
            max_chars,
            enabled,
        })
    }

    /// Create a disabled publisher (for testing/dry-run)
    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            user_token: SecretString::new("".into()),
            base_url: String::new(),
            max_chars: 280,
            enabled: false,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.user_token.expose_secret())
    }

    /// Upload an image, returning its media id
    async fn upload_media(&self, image: &Path) -> Result<String, PublishError> {
        let bytes = tokio::fs::read(image)
            .await
            .map_err(|e| PublishError::Api(format!("Cannot read {}: {e}", image.display())))?;

        let file_name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "card".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime_for(image))
            .map_err(|e| PublishError::Api(e.to_string()))?;
        let form = Form::new()
            .part("media", part)
            .text("media_category", "tweet_image");

        let response = self
            .client
            .post(self.endpoint("/2/media/upload"))
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(map_transport)?;

        let response = check_status(response).await?;
        let upload: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(upload.data.id)
    }

    /// Attach alt text to uploaded media
    async fn set_alt_text(&self, media_id: &str, text: &str) -> Result<(), PublishError> {
        let request = MediaMetadataRequest {
            id: media_id,
            metadata: MediaMetadata {
                alt_text: AltText { text },
            },
        };

        let response = self
            .client
            .post(self.endpoint("/2/media/metadata"))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        check_status(response).await?;
        Ok(())
    }

    /// Upload the post's image with its caption as alt text
    async fn attach_image(
        &self,
        image: &Path,
        caption: Option<&str>,
    ) -> Result<String, PublishError> {
        let media_id = self.upload_media(image).await?;

        if let Some(caption) = caption {
            if let Err(e) = self.set_alt_text(&media_id, caption).await {
                tracing::warn!(media_id = %media_id, error = %e, "Setting alt text failed");
            }
        }

        Ok(media_id)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "image/png",
    }
}

fn map_transport(error: reqwest::Error) -> PublishError {
    if error.is_timeout() {
        PublishError::Timeout
    } else {
        PublishError::Api(error.to_string())
    }
}

/// Seconds until the `x-rate-limit-reset` epoch, if the header is present
fn rate_limit_wait(response: &Response) -> Option<Duration> {
    let reset: i64 = response
        .headers()
        .get("x-rate-limit-reset")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    let wait = reset - OffsetDateTime::now_utc().unix_timestamp();
    Some(Duration::from_secs(u64::try_from(wait.max(0)).unwrap_or(0)))
}

/// Map a non-success response to the publish error taxonomy
async fn check_status(response: Response) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(PublishError::RateLimited(rate_limit_wait(&response)));
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::UNAUTHORIZED => PublishError::Auth(format!("Invalid user token: {body}")),
        StatusCode::FORBIDDEN => PublishError::Forbidden(body),
        s if s.is_server_error() => PublishError::Api(format!("{s}: {body}")),
        s => PublishError::Rejected(format!("{s}: {body}")),
    })
}

#[derive(Serialize)]
struct CreateTweetRequest {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<MediaSettings>,
}

#[derive(Serialize)]
struct MediaSettings {
    media_ids: Vec<String>,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: TweetData,
}

#[derive(Deserialize)]
struct TweetData {
    id: String,
}

#[derive(Serialize)]
struct MediaMetadataRequest<'a> {
    id: &'a str,
    metadata: MediaMetadata<'a>,
}

#[derive(Serialize)]
struct MediaMetadata<'a> {
    alt_text: AltText<'a>,
}

#[derive(Serialize)]
struct AltText<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct MediaUploadResponse {
    data: MediaData,
}

#[derive(Deserialize)]
struct MediaData {
    id: String,
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, post: &OutboundPost) -> Result<PublishResult, PublishError> {
        if !self.enabled {
            return Err(PublishError::Disabled);
        }

        // Validate content length
        let len = post.text.chars().count();
        if len > self.max_chars {
            return Err(PublishError::ContentTooLong {
                len,
                max: self.max_chars,
            });
        }

        // The image is optional: a failed upload still posts the text
        let media = match &post.image_path {
            Some(image) => match self.attach_image(image, post.caption.as_deref()).await {
                Ok(id) => Some(MediaSettings {
                    media_ids: vec![id],
                }),
                Err(e) => {
                    tracing::warn!(image = %image.display(), error = %e, "Media upload failed, posting text only");
                    None
                }
            },
            None => None,
        };

        let request = CreateTweetRequest {
            text: post.text.clone(),
            media,
        };

        let response = self
            .client
            .post(self.endpoint("/2/tweets"))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_transport)?;

        let response = check_status(response).await?;

        let tweet_response: CreateTweetResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Api(e.to_string()))?;

        Ok(PublishResult {
            url: Some(format!("https://x.com/i/status/{}", tweet_response.data.id)),
            id: tweet_response.data.id,
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn platform(&self) -> &'static str {
        "x"
    }
}
