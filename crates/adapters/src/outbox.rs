//! Outbox publisher for require-approval mode.
//!
//! Posts are appended as JSON lines instead of going to the network, so an
//! operator can review and send them by hand.

use async_trait::async_trait;
use crypto_scout_domain::{OutboundPost, PublishError, PublishResult, Publisher, fingerprint};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct OutboxWriter {
    path: PathBuf,
    file: Arc<Mutex<tokio::fs::File>>,
}

impl OutboxWriter {
    pub async fn new(path: PathBuf) -> Result<Self, OutboxError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, entry: &OutboxEntry<'_>) -> Result<(), OutboxError> {
        let line = serde_json::to_string(entry)?;
        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    writer: OutboxWriter,
    platform: &'static str,
}

impl OutboxPublisher {
    pub fn new(writer: OutboxWriter, platform: &'static str) -> Self {
        Self { writer, platform }
    }
}

#[derive(Serialize)]
struct OutboxEntry<'a> {
    id: &'a str,
    platform: &'a str,
    created_at: String,
    fingerprint: String,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_path: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<&'a str>,
}

#[async_trait]
impl Publisher for OutboxPublisher {
    async fn publish(&self, post: &OutboundPost) -> Result<PublishResult, PublishError> {
        let id = Uuid::new_v4().to_string();
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| PublishError::Api(format!("Timestamp formatting failed: {e}")))?;

        let entry = OutboxEntry {
            id: &id,
            platform: self.platform,
            created_at,
            fingerprint: fingerprint(&post.text),
            text: &post.text,
            image_path: post.image_path.as_deref(),
            caption: post.caption.as_deref(),
        };

        self.writer
            .append(&entry)
            .await
            .map_err(|error| PublishError::Api(format!("Outbox write failed: {}", error)))?;

        tracing::info!(path = %self.writer.path().display(), id = %id, "Post queued in outbox");

        Ok(PublishResult { id, url: None })
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn platform(&self) -> &'static str {
        self.platform
    }
}
