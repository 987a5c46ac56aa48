//! Stub generator for offline runs and tests

use async_trait::async_trait;
use crypto_scout_domain::{Draft, DraftGenerator, DraftRequest, GenerateError};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Generator that writes a template post, varying the wording per call
pub struct StubGenerator {
    fail: bool,
    calls: AtomicUsize,
}

const ANGLES: [&str; 4] = [
    "Early listing, little history to go on",
    "Fresh on the radar, thin public data so far",
    "New name, docs and tokenomics still sparse",
    "Just surfaced, worth a closer look before any move",
];

impl StubGenerator {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A stub whose every call fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for StubGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DraftGenerator for StubGenerator {
    async fn generate(&self, request: &DraftRequest) -> Result<Draft, GenerateError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenerateError::Api("stub generator configured to fail".to_string()));
        }

        let project = &request.project;
        let ticker = match project.symbol.trim() {
            "" => String::new(),
            symbol => format!(" (${symbol})"),
        };
        let angle = ANGLES[call % ANGLES.len()];

        Ok(Draft {
            text: format!(
                "{}{} spotted via {}.\n{} (take {}).\nRisk: early project, unverified data.",
                project.name.trim(),
                ticker,
                request.section.label(),
                angle,
                call + 1
            ),
            caption: project.name.trim().to_string(),
        })
    }
}
