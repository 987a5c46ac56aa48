//! Application use cases / business logic

pub mod draft;
pub mod orchestrator;

pub use draft::{DraftConfig, DraftUseCase, FormattedDraft};
pub use orchestrator::{DEFAULT_FALLBACK_TEXT, RunConfig, RunDeps, RunError, RunOrchestrator};
