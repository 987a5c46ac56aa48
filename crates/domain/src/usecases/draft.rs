//! Drafting use case: generator call plus format enforcement

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    model::{Draft, DraftRequest, OutboundPost, Project},
    policy::PostFormat,
    ports::{DraftGenerator, GenerateError},
};

/// Configuration for the draft use case
#[derive(Debug, Clone)]
pub struct DraftConfig {
    /// Shape every draft is forced into
    pub format: PostFormat,
    /// Upper bound on one generator call
    pub timeout: Duration,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            format: PostFormat::default(),
            timeout: Duration::from_secs(45),
        }
    }
}

/// A draft that already satisfies the post format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDraft {
    pub text: String,
    pub caption: String,
    /// False when the canned fallback text was used
    pub generated: bool,
}

impl FormattedDraft {
    /// Post carrying this draft's text and caption
    pub fn into_post(self, image_path: Option<PathBuf>) -> OutboundPost {
        OutboundPost {
            text: self.text,
            image_path,
            caption: Some(self.caption).filter(|c| !c.is_empty()),
        }
    }
}

/// Use case for producing post text
pub struct DraftUseCase<G: ?Sized> {
    generator: Arc<G>,
    config: DraftConfig,
}

impl<G: DraftGenerator + ?Sized> DraftUseCase<G> {
    pub fn new(generator: Arc<G>, config: DraftConfig) -> Self {
        Self { generator, config }
    }

    /// Call the generator once and enforce the format on its output
    pub async fn generate(&self, request: &DraftRequest) -> Result<FormattedDraft, GenerateError> {
        tracing::info!(
            project = %request.project.name,
            section = %request.section,
            "Generating draft"
        );

        let draft = tokio::time::timeout(self.config.timeout, self.generator.generate(request))
            .await
            .map_err(|_| GenerateError::Timeout)??;

        Ok(self.finish(draft, &request.project, true))
    }

    /// Like [`generate`](Self::generate), but falls back to canned text on failure
    pub async fn generate_or_fallback(&self, request: &DraftRequest) -> FormattedDraft {
        match self.generate(request).await {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(
                    project = %request.project.name,
                    error = %e,
                    "Draft generation failed, using fallback text"
                );
                self.fallback(&request.project)
            }
        }
    }

    /// Canned draft for a project, formatted
    pub fn fallback(&self, project: &Project) -> FormattedDraft {
        self.finish(Draft::fallback(project), project, false)
    }

    fn finish(&self, draft: Draft, project: &Project, generated: bool) -> FormattedDraft {
        let text = self.config.format.enforce(&draft.text, &project.url);
        let caption = match draft.caption.trim() {
            "" => project.name.trim(),
            caption => caption,
        };

        FormattedDraft {
            text,
            caption: caption.chars().take(Draft::MAX_CAPTION_CHARS).collect(),
            generated,
        }
    }
}
