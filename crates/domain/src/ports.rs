//! Port definitions (traits) for external dependencies
//!
//! These traits define the boundaries between the domain and external systems.
//! Adapters implement these traits to connect to real infrastructure.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use time::OffsetDateTime;

use crate::model::{Draft, DraftRequest, OutboundPost, Project, RunState, Section};

/// Port for fetching candidate projects from one upstream source
///
/// Implementations never fail: any fetch or parse problem is logged and
/// reported as an empty list.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// Short source name for logs
    fn name(&self) -> &'static str;

    /// Whether this source covers the given section
    fn serves(&self, section: Section) -> bool;

    /// Fetch the current candidates for a section
    async fn fetch_projects(&self, section: Section) -> Vec<Project>;
}

/// Port for best-effort canonical URL resolution (redirect following)
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Resolve `raw`, returning it unchanged on any failure
    async fn resolve(&self, raw: &str) -> String;
}

/// Resolver that keeps every URL as-is
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughResolver;

#[async_trait]
impl UrlResolver for PassthroughResolver {
    async fn resolve(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// Error type for content generation
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("LLM API error: {0}")]
    Api(String),
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),
    #[error("Rate limited")]
    RateLimited,
    #[error("Timeout")]
    Timeout,
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Port for LLM-backed drafting
///
/// Calling it twice with the same request may return different text.
#[async_trait]
pub trait DraftGenerator: Send + Sync {
    async fn generate(&self, request: &DraftRequest) -> Result<Draft, GenerateError>;
}

/// Error type for publisher operations
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limited, retry after: {0:?}")]
    RateLimited(Option<Duration>),
    #[error("Timed out")]
    Timeout,
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Content too long: {len} > {max}")]
    ContentTooLong { len: usize, max: usize },
    #[error("Publisher is disabled")]
    Disabled,
}

impl PublishError {
    /// Transient failures worth one more attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PublishError::Api(_) | PublishError::RateLimited(_) | PublishError::Timeout
        )
    }
}

/// Result of a successful publish operation
#[derive(Debug, Clone)]
pub struct PublishResult {
    /// Platform-specific post ID
    pub id: String,
    /// URL to the published content, if available
    pub url: Option<String>,
}

/// Port for publishing a finished post
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a post, returns the published ID
    async fn publish(&self, post: &OutboundPost) -> Result<PublishResult, PublishError>;

    /// Check if this publisher is enabled
    fn is_enabled(&self) -> bool;

    /// Get the platform name (e.g., "x", "outbox")
    fn platform(&self) -> &'static str;
}

/// Error type for state store operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Port for persisting the run state document
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state; a missing or unreadable document yields an empty state
    async fn load(&self) -> RunState;

    /// Replace the stored document
    async fn save(&self, state: &RunState) -> Result<(), StateError>;
}

/// Port for time/clock operations (enables deterministic testing)
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> OffsetDateTime;
}

/// Real clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Port for randomness (enables deterministic testing)
pub trait RandomSource: Send + Sync {
    /// Uniform index in `0..len`; `len` must be non-zero
    fn index(&self, len: usize) -> usize;

    /// Uniform sample in `[0, 1)`
    fn unit(&self) -> f64;
}

/// `StdRng`-backed randomness, optionally seeded
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_os() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }
}

impl RandomSource for SeededRandom {
    fn index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.with_rng(|rng| rng.random_range(0..len))
    }

    fn unit(&self) -> f64 {
        self.with_rng(|rng| rng.random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::from_seed(42);
        let b = SeededRandom::from_seed(42);

        let picks_a: Vec<_> = (0..16).map(|_| a.index(10)).collect();
        let picks_b: Vec<_> = (0..16).map(|_| b.index(10)).collect();

        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|i| *i < 10));
    }

    #[test]
    fn test_seeded_random_unit_range() {
        let random = SeededRandom::from_seed(7);
        for _ in 0..100 {
            let value = random.unit();
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_publish_error_classification() {
        assert!(PublishError::RateLimited(None).is_retryable());
        assert!(PublishError::Timeout.is_retryable());
        assert!(PublishError::Api("502".to_string()).is_retryable());
        assert!(!PublishError::Auth("bad token".to_string()).is_retryable());
        assert!(!PublishError::Forbidden("duplicate".to_string()).is_retryable());
        assert!(!PublishError::Rejected("400".to_string()).is_retryable());
        assert!(!PublishError::ContentTooLong { len: 300, max: 280 }.is_retryable());
        assert!(!PublishError::Disabled.is_retryable());
    }

    #[tokio::test]
    async fn test_passthrough_resolver_keeps_url() {
        let resolver = PassthroughResolver;
        assert_eq!(resolver.resolve("https://x/y").await, "https://x/y");
    }
}
