//! X (Twitter) API adapters

mod write;

pub use write::{DEFAULT_BASE_URL, XPublisher};

use async_trait::async_trait;
use crypto_scout_domain::{OutboundPost, PublishError, PublishResult, Publisher};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Stub X publisher for testing
///
/// Scripted failures are returned first, in order; after that every
/// publish succeeds.
pub struct StubXPublisher {
    enabled: bool,
    failures: Mutex<VecDeque<PublishError>>,
    published: Mutex<Vec<OutboundPost>>,
}

impl StubXPublisher {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            failures: Mutex::new(VecDeque::new()),
            published: Mutex::new(vec![]),
        }
    }

    /// Fail the next publishes with these errors
    pub fn failing_with(errors: Vec<PublishError>) -> Self {
        Self {
            failures: Mutex::new(errors.into()),
            ..Self::new(true)
        }
    }

    /// Get all posts that were published
    pub fn get_published(&self) -> Vec<OutboundPost> {
        self.published
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Publisher for StubXPublisher {
    async fn publish(&self, post: &OutboundPost) -> Result<PublishResult, PublishError> {
        if !self.enabled {
            return Err(PublishError::Disabled);
        }

        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(error) = failure {
            return Err(error);
        }

        let mut published = self.published.lock().unwrap_or_else(|e| e.into_inner());
        published.push(post.clone());
        let id = format!("stub_{}", published.len());

        Ok(PublishResult {
            url: Some(format!("https://x.com/stub/status/{id}")),
            id,
        })
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn platform(&self) -> &'static str {
        "x"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(text: &str) -> OutboundPost {
        OutboundPost {
            text: text.to_string(),
            image_path: None,
            caption: None,
        }
    }

    #[tokio::test]
    async fn test_stub_records_posts() {
        let publisher = StubXPublisher::new(true);
        let result = publisher.publish(&post("hello")).await.unwrap();

        assert_eq!(result.id, "stub_1");
        assert_eq!(publisher.get_published(), vec![post("hello")]);
    }

    #[tokio::test]
    async fn test_stub_scripted_failures_come_first() {
        let publisher = StubXPublisher::failing_with(vec![PublishError::Timeout]);

        assert!(matches!(
            publisher.publish(&post("a")).await,
            Err(PublishError::Timeout)
        ));
        assert!(publisher.publish(&post("b")).await.is_ok());
        assert_eq!(publisher.get_published().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_stub() {
        let publisher = StubXPublisher::new(false);
        assert!(!publisher.is_enabled());
        assert!(matches!(
            publisher.publish(&post("a")).await,
            Err(PublishError::Disabled)
        ));
    }
}
